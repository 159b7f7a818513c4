//! IBM Cloud IAM constants

/// IAM token endpoint used when none is configured (staging IAM).
pub const DEFAULT_IAM_URL: &str = "https://iam.test.cloud.ibm.com/identity/token";

/// OAuth grant type for exchanging an API key at IAM.
pub const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Credential record location used when none is configured.
pub const DEFAULT_TOKEN_FILE: &str = "token.json";
