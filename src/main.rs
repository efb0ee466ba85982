#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pawhaven::start_server().await
}
