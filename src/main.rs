use std::io::Write as _;

use ringstore::config::Config;
use ringstore::node::client::Client;
use ringstore::node::Node;
use ringstore::transport::Listener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || !args[1].starts_with('-') {
        eprintln!("Usage: {} -<coordinator-ip> [-client]", args[0]);
        eprintln!("Example: {} -127.0.0.1          (coordinator or data node)", args[0]);
        eprintln!("Example: {} -127.0.0.1 -client  (interactive client)", args[0]);
        std::process::exit(1);
    }

    let coordinator_address = args[1].trim_start_matches('-').to_string();
    let as_client = args.get(2).map(|arg| arg == "-client").unwrap_or(false);

    let config = Config::from_env();
    let own_address =
        std::env::var("RINGSTORE_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    tracing::info!(
        "Options: port={} replication_factor={} default_ring_size={} timeout={}ms data_dir={}",
        config.port,
        config.replication_factor,
        config.default_ring_size,
        config.network_timeout_ms,
        config.data_dir
    );

    if as_client {
        tracing::info!(
            "Starting client against coordinator {}",
            coordinator_address
        );
        let client = Client::new(own_address, coordinator_address, &config);
        return run_client(client).await;
    }

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = Listener::bind(&bind_addr, config.network_timeout()).await?;

    let node = if own_address == coordinator_address {
        tracing::info!("Starting as coordinator at {} on {}", own_address, bind_addr);
        Node::coordinator(own_address, config)?
    } else {
        tracing::info!(
            "Starting as data node at {} on {} (coordinator {})",
            own_address,
            bind_addr,
            coordinator_address
        );
        Node::data_node(own_address, coordinator_address, config)?
    };

    node.run(listener).await?;
    Ok(())
}

/// Interactive loop: `R` read, `W` write, `D` delete, `E` exit.
async fn run_client(client: Client) -> anyhow::Result<()> {
    loop {
        let command = prompt("Enter command (R = read, W = write, D = delete, E = exit): ")?;

        match command.trim().to_uppercase().as_str() {
            "R" => {
                let key = prompt("Enter key: ")?;
                match client.read(key.trim()).await {
                    Ok(record) => {
                        println!("Key: {}", record.key);
                        println!("Value: {}", record.value);
                        println!("TimeStamp: {}", record.timestamp);
                    }
                    Err(_) => println!("Key was not found."),
                }
            }
            "W" => {
                let key = prompt("Enter key: ")?;
                let value = prompt("Enter value: ")?;
                match client.write(key.trim(), value.trim()).await {
                    Ok(()) => println!("Stored."),
                    Err(e) => println!("Write failed: {}", e),
                }
            }
            "D" => {
                let key = prompt("Enter key: ")?;
                match client.delete(key.trim()).await {
                    Ok(()) => println!("Deleted."),
                    Err(_) => println!("Key was not found."),
                }
            }
            "E" => return Ok(()),
            "" => {}
            other => println!("Unknown command '{}'", other),
        }
    }
}

fn prompt(text: &str) -> std::io::Result<String> {
    print!("{}", text);
    std::io::stdout().flush()?;

    let mut line = String::new();
    if std::io::stdin().read_line(&mut line)? == 0 {
        // EOF behaves like exit.
        line.push('E');
    }
    Ok(line)
}
