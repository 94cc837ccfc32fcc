//! GraphQL documents sent to the Kraken endpoint

/// Exchange e-mail and password for a JWT
pub const OBTAIN_TOKEN_MUTATION: &str = r#"
mutation obtainKrakenToken($input: ObtainJSONWebTokenInput!) {
  obtainKrakenToken(input: $input) {
    token
    refreshToken
    refreshExpiresIn
  }
}
"#;

/// Accounts visible to the authenticated viewer
pub const ACCOUNT_VIEWER_QUERY: &str = r#"
query accountViewer {
  viewer {
    accounts {
      number
    }
  }
}
"#;

/// Half-hourly readings of the first electricity supply point
pub const HALF_HOURLY_READINGS_QUERY: &str = r#"
query halfHourlyReadings($accountNumber: String!, $fromDatetime: DateTime, $toDatetime: DateTime) {
  account(accountNumber: $accountNumber) {
    properties {
      electricitySupplyPoints {
        halfHourlyReadings(fromDatetime: $fromDatetime, toDatetime: $toDatetime) {
          startAt
          endAt
          version
          value
        }
      }
    }
  }
}
"#;
