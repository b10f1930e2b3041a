mod consumer_test;
mod publisher_test;
