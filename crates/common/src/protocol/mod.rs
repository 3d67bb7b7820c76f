// Wire formats received from the webhook sender.

pub mod push;
