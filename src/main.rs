#[tokio::main]
async fn main() -> anyhow::Result<()> {
    universal_downloader_lib::run().await
}
