mod email_sent_test;
mod helpers;
