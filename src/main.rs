#[rocket::main]
async fn main() -> anyhow::Result<()> {
    roomwatch::run().await
}
