mod check;
mod cli;
mod infra;
mod protection;
mod routes;
mod server;

use scholarship_intake::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
