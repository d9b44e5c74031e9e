pub mod admin_helpers;
pub mod admin_resources;
pub mod form_helpers;
pub mod intake_helpers;
pub mod mail_helpers;
pub mod public_helpers;
pub mod sanitization_helpers;
pub mod slug_helpers;
