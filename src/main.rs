#[tokio::main]
async fn main() -> anyhow::Result<()> {
    boarding_student::start_server().await
}
