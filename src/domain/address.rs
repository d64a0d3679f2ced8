use crate::domain::reference::{is_country_code, is_us_state_code};
use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};

/// A billing or delivery address.
///
/// Construction validates the country, and the state when the country is `US`.
/// The state is dropped for every other country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub first_names: String,
    pub surname: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub state: Option<String>,
    pub post_code: String,
    pub country: String,
    pub phone: String,
}

impl Address {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        first_names: &str,
        surname: &str,
        address1: &str,
        address2: &str,
        city: &str,
        state: &str,
        post_code: &str,
        country: &str,
        phone: &str,
    ) -> Result<Self> {
        let country = country.trim().to_ascii_uppercase();
        if !is_country_code(&country) {
            return Err(GatewayError::validation(format!(
                "'{}' is not a recognised country code",
                country
            )));
        }

        let state = if country == "US" {
            let state = state.trim().to_ascii_uppercase();
            if !is_us_state_code(&state) {
                return Err(GatewayError::validation(format!(
                    "'{}' is not a recognised US state code",
                    state
                )));
            }
            Some(state)
        } else {
            None
        };

        Ok(Self {
            first_names: first_names.to_string(),
            surname: surname.to_string(),
            address1: address1.to_string(),
            address2: address2.to_string(),
            city: city.to_string(),
            state,
            post_code: post_code.to_string(),
            country,
            phone: phone.to_string(),
        })
    }
}
