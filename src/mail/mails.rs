use async_trait::async_trait;

use super::sendmail::send_email;
use crate::config::SmtpConfig;
use crate::intake::{ContactNotifier, NotifyError};
use crate::models::{ContactKind, ContactMessage};

const CONTACT_TEMPLATE: &str = include_str!("templates/contact-notification.html");

/// Emails the team when a contact message is stored
///
/// Individual messages go to the contact inbox, merchant requests to the
/// partnerships inbox.
pub struct MailNotifier {
    smtp: SmtpConfig,
    contact_email: String,
    partners_email: String,
}

impl MailNotifier {
    pub fn new(smtp: SmtpConfig, contact_email: String, partners_email: String) -> Self {
        Self {
            smtp,
            contact_email,
            partners_email,
        }
    }

    fn recipient(&self, kind: ContactKind) -> &str {
        match kind {
            ContactKind::Individual => &self.contact_email,
            ContactKind::Merchant => &self.partners_email,
        }
    }
}

pub fn subject(message: &ContactMessage) -> String {
    match message.kind {
        ContactKind::Individual => format!("[Contact] Nouveau message de {}", message.name),
        ContactKind::Merchant => format!(
            "[Partenariat] Demande de {}",
            message.company_name.as_deref().unwrap_or(&message.name)
        ),
    }
}

/// Template values, HTML-escaped
pub fn placeholders(message: &ContactMessage) -> Vec<(String, String)> {
    let esc = ammonia::clean_text;

    let heading = match message.kind {
        ContactKind::Individual => "Nouveau message d'un particulier",
        ContactKind::Merchant => "Nouvelle demande de partenariat",
    };

    let mut merchant_rows = String::new();
    for (label, value) in [
        ("Entreprise", message.company_name.as_deref()),
        ("Fonction", message.position.as_deref()),
        ("Téléphone", message.phone.as_deref()),
    ] {
        if let Some(value) = value {
            merchant_rows.push_str(&format!(
                "<tr><td style=\"padding: 4px 0; font-weight: bold;\">{}</td><td>{}</td></tr>",
                label,
                esc(value)
            ));
        }
    }

    vec![
        ("{{subject}}".to_string(), esc(&subject(message))),
        ("{{heading}}".to_string(), heading.to_string()),
        ("{{name}}".to_string(), esc(&message.name)),
        ("{{email}}".to_string(), esc(&message.email)),
        ("{{merchant_rows}}".to_string(), merchant_rows),
        ("{{message}}".to_string(), esc(&message.message)),
        (
            "{{received_at}}".to_string(),
            message.created_at.format("%d/%m/%Y %H:%M").to_string(),
        ),
        ("{{id}}".to_string(), message.id.to_string()),
    ]
}

#[async_trait]
impl ContactNotifier for MailNotifier {
    async fn notify(&self, message: &ContactMessage) -> Result<(), NotifyError> {
        let smtp = self.smtp.clone();
        let to = self.recipient(message.kind).to_string();
        let reply_to = message.email.clone();
        let subject = subject(message);
        let placeholders = placeholders(message);

        // lettre's SmtpTransport is blocking
        tokio::task::spawn_blocking(move || {
            send_email(
                &smtp,
                &to,
                Some(&reply_to),
                &subject,
                CONTACT_TEMPLATE,
                &placeholders,
            )
            .map_err(|e| NotifyError(e.to_string()))
        })
        .await
        .map_err(|e| NotifyError(e.to_string()))??;

        tracing::info!(id = %message.id, "contact notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn message(kind: ContactKind) -> ContactMessage {
        ContactMessage {
            id: Uuid::new_v4(),
            kind,
            name: "Jean <Payet>".into(),
            email: "jean@example.re".into(),
            message: "Bonjour".into(),
            company_name: (kind == ContactKind::Merchant).then(|| "Boulangerie & Co".to_string()),
            phone: (kind == ContactKind::Merchant).then(|| "0262000000".to_string()),
            position: None,
            is_read: false,
            is_archived: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn subject_depends_on_kind() {
        assert_eq!(
            subject(&message(ContactKind::Individual)),
            "[Contact] Nouveau message de Jean <Payet>"
        );
        assert_eq!(
            subject(&message(ContactKind::Merchant)),
            "[Partenariat] Demande de Boulangerie & Co"
        );
    }

    #[test]
    fn placeholder_values_are_escaped() {
        let values = placeholders(&message(ContactKind::Merchant));
        let name = values.iter().find(|(k, _)| k == "{{name}}").unwrap();
        assert!(!name.1.contains('<'));
        let rows = values.iter().find(|(k, _)| k == "{{merchant_rows}}").unwrap();
        assert!(rows.1.contains("Entreprise"));
        assert!(!rows.1.contains("Fonction"));
    }
}
