use clap;
use log;
use sensorlink::servant::Servant;
use simple_logger;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app = clap::Command::new("sensorlink-servant")
        .version("0.1.0")
        .arg(
            clap::arg!(listen: --listen <ADDRESS> "local link address")
                .required(true)
                .env("SENSORLINK_SERVANT_LISTEN"),
        )
        .arg(
            clap::arg!(id: -i --id <id> "unit id")
                .required(true)
                .value_parser(clap::value_parser!(u8))
                .env("SENSORLINK_SERVANT_ID"),
        )
        .arg(
            clap::arg!(loglevel: -l --loglevel <LOGLEVEL> "loglevel")
                .value_parser([
                    clap::builder::PossibleValue::new("error"),
                    clap::builder::PossibleValue::new("warn"),
                    clap::builder::PossibleValue::new("info"),
                    clap::builder::PossibleValue::new("debug"),
                ])
                .env("SENSORLINK_LOGLEVEL"),
        )
        .get_matches();
    match app
        .get_one::<String>("loglevel")
        .unwrap_or(&String::from("info"))
        .as_str()
    {
        "error" => {
            simple_logger::init_with_level(log::Level::Error)?;
        }
        "warn" => {
            simple_logger::init_with_level(log::Level::Warn)?;
        }
        "debug" => {
            simple_logger::init_with_level(log::Level::Debug)?;
        }
        _ => {
            simple_logger::init_with_level(log::Level::Info)?;
        }
    }
    let listen = app.get_one::<String>("listen").ok_or("missing listen address")?;
    let id = *app.get_one::<u8>("id").ok_or("missing unit id")?;
    let mut servant = Servant::bind(listen, id).await?;
    servant.work().await;
    Ok(())
}
