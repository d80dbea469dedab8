#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rampur_news_lib::run().await
}
