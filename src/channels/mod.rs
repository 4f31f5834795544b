mod telegram;

pub use telegram::MensaBot;
