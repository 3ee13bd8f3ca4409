use serde::Deserialize;

#[derive(Clone, Deserialize)]
pub struct TokenSettings {
    ///
    /// Lifetime of access tokens issued by `generate_access_token`
    ///
    pub jwt_lifetime_s: i64,
}
