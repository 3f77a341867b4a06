use tracing::{debug, warn};

use crate::error::ClientError;
use crate::users::dto::{NutritionNeeds, ProfileForm, UserProfile};

/// Last known profile and daily targets of the signed-in user.
///
/// Fetch failures never wipe what is shown; they are recorded in
/// `last_error` instead. Results tagged with an older generation (issued
/// before a sign-out or user switch) are dropped.
#[derive(Debug, Clone, Default)]
pub struct ProfileState {
    profile: Option<UserProfile>,
    needs: NutritionNeeds,
    generation: u64,
    saving: bool,
    last_error: Option<String>,
}

impl ProfileState {
    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn needs(&self) -> NutritionNeeds {
        self.needs
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Pre-filled form for the profile editor.
    pub fn form(&self) -> ProfileForm {
        self.profile.as_ref().map(ProfileForm::from).unwrap_or_default()
    }

    pub fn reset(&mut self) {
        self.generation += 1;
        self.profile = None;
        self.needs = NutritionNeeds::default();
        self.saving = false;
        self.last_error = None;
    }

    fn is_current(&self, generation: u64) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "discarding stale profile result");
            return false;
        }
        true
    }

    pub fn apply_profile(&mut self, generation: u64, result: Result<UserProfile, ClientError>) {
        if !self.is_current(generation) {
            return;
        }
        match result {
            Ok(p) => {
                self.profile = Some(p);
                self.last_error = None;
            }
            Err(e) if e.is_not_found() => {
                debug!("no profile stored yet");
            }
            Err(e) => {
                warn!(error = %e, "fetching profile failed");
                self.last_error = Some(e.to_string());
            }
        }
    }

    pub fn apply_needs(&mut self, generation: u64, result: Result<NutritionNeeds, ClientError>) {
        if !self.is_current(generation) {
            return;
        }
        match result {
            Ok(n) => self.needs = n,
            Err(e) if e.is_not_found() => {
                debug!("no nutrition needs without a profile");
            }
            Err(e) => {
                warn!(error = %e, "fetching nutrition needs failed");
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Validates the form and marks a save as in flight.
    pub fn begin_save(&mut self, form: &ProfileForm) -> Result<UserProfile, ClientError> {
        if self.saving {
            return Err(ClientError::Busy);
        }
        let profile = form.to_profile()?;
        self.saving = true;
        Ok(profile)
    }

    /// Returns true when the save stuck and the needs should be refetched.
    pub fn finish_save(
        &mut self,
        generation: u64,
        profile: UserProfile,
        result: Result<(), ClientError>,
    ) -> Result<bool, ClientError> {
        if !self.is_current(generation) {
            return Ok(false);
        }
        self.saving = false;
        match result {
            Ok(()) => {
                self.profile = Some(profile);
                self.last_error = None;
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "saving profile failed; keeping previous profile");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}
