//! TURN relay provisioning: fetch short-lived relay credentials and merge
//! them into the ICE configuration before endpoints are created.
pub mod http_provider;
pub mod provision;
pub mod provision_error;
pub mod relay_credentials;

pub use http_provider::HttpCredentialProvider;
pub use provision::provision_relay;
pub use provision_error::ProvisionError;
pub use relay_credentials::{RelayCredentialProvider, RelayCredentials};
