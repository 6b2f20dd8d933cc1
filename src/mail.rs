mod mails;
mod sendmail;

pub use mails::MailNotifier;
