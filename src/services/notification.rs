use serde::Serialize;
use url::Url;

use crate::config::AppConfig;
use crate::models::Booking;
use crate::services::validation::format_date_br;

/// WhatsApp deep links that open a chat with the shop pre-filled with the
/// confirmation text.
#[derive(Debug, Clone, Serialize)]
pub struct WhatsAppLinks {
    pub mobile: String,
    pub mobile_simple: String,
    pub desktop: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Confirmation {
    pub message: String,
    pub simple_message: String,
    pub whatsapp_links: WhatsAppLinks,
}

pub fn confirmation_message(booking: &Booking, config: &AppConfig) -> String {
    let mut message = format!(
        "✂️ *{shop}* ✂️\n\
         \n\
         *BOOKING CONFIRMATION*\n\
         \n\
         👤 *Customer:* {name}\n\
         📞 *Phone:* {phone}\n\
         ✂️ *Service:* {service}\n\
         📅 *Date:* {date}\n\
         ⏰ *Time:* {time}\n\
         💰 *Price:* {currency} {price:.2}\n\
         ⏱️ *Duration:* {duration} min\n\
         \n\
         🔢 *Confirmation code:* {code}\n",
        shop = config.shop_name,
        name = booking.customer_name,
        phone = booking.customer_phone,
        service = booking.service_name,
        date = format_date_br(booking.date),
        time = booking.start_time.format("%H:%M"),
        currency = config.currency,
        price = booking.price,
        duration = booking.duration_minutes,
        code = booking.confirmation_code,
    );

    if let Some(notes) = &booking.notes {
        message.push_str(&format!("📝 *Notes:* {notes}\n"));
    }
    if !config.shop_address.is_empty() {
        message.push_str(&format!("\n📍 *Address:*\n{}\n", config.shop_address));
    }
    message.push_str("Thank you for choosing us! 💈");
    message
}

pub fn simple_message(booking: &Booking, config: &AppConfig) -> String {
    format!(
        "Booking at {}: {} - {} - {} - {} - Code: {}",
        config.shop_name,
        booking.customer_name,
        booking.service_name,
        format_date_br(booking.date),
        booking.start_time.format("%H:%M"),
        booking.confirmation_code
    )
}

pub fn whatsapp_links(
    number: &str,
    message: &str,
    simple: &str,
) -> Result<WhatsAppLinks, url::ParseError> {
    let mobile_base = format!("https://wa.me/{number}");

    Ok(WhatsAppLinks {
        mobile: Url::parse_with_params(&mobile_base, &[("text", message)])?.into(),
        mobile_simple: Url::parse_with_params(&mobile_base, &[("text", simple)])?.into(),
        desktop: Url::parse_with_params(
            "https://web.whatsapp.com/send",
            &[("phone", number), ("text", message)],
        )?
        .into(),
    })
}

/// Builds everything a client needs to forward the confirmation to the shop.
pub fn confirmation(booking: &Booking, config: &AppConfig) -> Result<Confirmation, url::ParseError> {
    let message = confirmation_message(booking, config);
    let simple_message = simple_message(booking, config);
    let whatsapp_links = whatsapp_links(&config.shop_whatsapp, &message, &simple_message)?;

    Ok(Confirmation {
        message,
        simple_message,
        whatsapp_links,
    })
}
