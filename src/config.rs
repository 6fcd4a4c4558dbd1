use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub shop_name: String,
    pub shop_address: String,
    /// Owner's WhatsApp number, digits only, country code included.
    pub shop_whatsapp: String,
    pub phone_country_code: String,
    pub currency: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "barbershop.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            shop_name: env::var("SHOP_NAME").unwrap_or_else(|_| "Barber&Shop".to_string()),
            shop_address: env::var("SHOP_ADDRESS").unwrap_or_default(),
            shop_whatsapp: env::var("SHOP_WHATSAPP")
                .unwrap_or_default()
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect(),
            phone_country_code: env::var("PHONE_COUNTRY_CODE").unwrap_or_else(|_| "55".to_string()),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "R$".to_string()),
        }
    }
}
