#[tokio::main]
async fn main() {
    venue_booking_backend::run().await;
}
