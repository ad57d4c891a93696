//! API request models for profiles.
//!
//! The response shape is [`crate::profiles::Profile`] itself; profile rows
//! carry nothing the frontend should not see.

use serde::Deserialize;
use utoipa::ToSchema;

use crate::profiles::AccountType;

/// Self-service profile update. Only the account type is writable through
/// the API; `role` is administered directly in the data service.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProfileUpdateRequest {
    pub account_type: AccountType,
}
