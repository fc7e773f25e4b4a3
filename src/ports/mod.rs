pub mod authenticator;
pub mod track_provider;
