use lettre::{
    Message, SmtpTransport, Transport,
    message::{SinglePart, header},
    transport::smtp::authentication::Credentials,
};

use crate::config::SmtpConfig;

pub type MailResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Send an HTML email through the configured SMTP relay
///
/// `template` is the HTML body with `{{placeholder}}` markers; every
/// `(marker, value)` pair is substituted before sending. Values must already
/// be HTML-escaped.
///
/// Blocking: run it on a blocking thread from async code.
pub fn send_email(
    smtp: &SmtpConfig,
    to_email: &str,
    reply_to: Option<&str>,
    subject: &str,
    template: &str,
    placeholders: &[(String, String)],
) -> MailResult {
    let mut html = template.to_string();
    for (key, value) in placeholders {
        html = html.replace(key, value);
    }

    let mut builder = Message::builder()
        .from(smtp.username.parse()?)
        .to(to_email.parse()?)
        .subject(subject);
    if let Some(reply_to) = reply_to {
        builder = builder.reply_to(reply_to.parse()?);
    }

    let email = builder.singlepart(
        SinglePart::builder()
            .header(header::ContentType::TEXT_HTML)
            .body(html),
    )?;

    // STARTTLS relay: plain connection upgraded to TLS
    let creds = Credentials::new(smtp.username.clone(), smtp.password.clone());
    let mailer = SmtpTransport::starttls_relay(&smtp.server)?
        .credentials(creds)
        .port(smtp.port)
        .build();

    mailer.send(&email)?;
    Ok(())
}
