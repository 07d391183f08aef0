use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The authenticated viewer attached to a request or live connection.
///
/// Credential issuance and verification live outside this system; by the time
/// an `Identity` exists it has already been vouched for by the auth layer.
/// Identity is fixed for the lifetime of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    /// Stable user id from the system of record.
    pub id: i64,
    /// Email address, doubling as the display name in the conference feed.
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let identity = Identity {
            id: 7,
            email: "ada@example.edu".into(),
        };
        let json = serde_json::to_string(&identity).unwrap();
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, identity);
    }
}
