use tracing::{debug, info, instrument};

use crate::api::ApiClient;
use crate::auth::dto::{SignupRequest, SignupResponse, VerifyResponse};
use crate::error::{ClientError, Result};

/// Asks the backend to verify an identity token; returns the uid it
/// resolves to.
#[instrument(skip_all)]
pub async fn verify_token(api: &ApiClient, id_token: &str) -> Result<String> {
    let resp: VerifyResponse = api.get_bearer("/auth/verify", id_token).await?;
    if resp.uid.trim().is_empty() {
        return Err(ClientError::Malformed("verify response without uid"));
    }
    debug!(uid = %resp.uid, message = ?resp.message, "token verified");
    Ok(resp.uid)
}

/// Creates the account and its profile. The new user still has to sign in
/// with the identity provider afterwards.
#[instrument(skip_all)]
pub async fn sign_up(api: &ApiClient, request: &SignupRequest) -> Result<()> {
    let resp: SignupResponse = api.post("/auth/signup", request).await?;
    info!(uid = ?resp.uid, message = ?resp.message, "account created");
    Ok(())
}
