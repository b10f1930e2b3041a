mod order_created_test;
mod router_test;
