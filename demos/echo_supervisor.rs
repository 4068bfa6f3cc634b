//! Echo client example using the connection supervisor.
//!
//! This example connects to a WebSocket echo server with a token and device type, sends a
//! couple of messages and closes the connection from inside the message handler. With
//! auto-reconnect enabled, a dropped connection is re-established every two seconds.

use std::time::Duration;
use s9_ws_supervisor::protocol::AppMessage;
use s9_ws_supervisor::{ConnectionState, ConnectionSupervisor, ControlMessage, EventHandlers, SupervisorOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let options = SupervisorOptions::new()
        .auto_reconnect(true)
        .reconnect_interval(Duration::from_secs(2))?
        .heartbeat_interval(Duration::from_secs(10))?
        .debug_logging(true);

    let mut supervisor = ConnectionSupervisor::new(options);
    let control_tx = supervisor.control_sender();
    let greeting_tx = supervisor.control_sender();

    let mut message_count = 0;
    supervisor.set_event_handlers(
        EventHandlers::new()
            .on_message(move |text| {
                match AppMessage::parse(text) {
                    Some(AppMessage::AuthResponse { success, message }) => {
                        println!("Auth {}: {}", if success { "succeeded" } else { "failed" }, message.unwrap_or_default());
                    },
                    _ => println!("Received: {}", text),
                }

                message_count += 1;
                if message_count >= 2 {
                    println!("Closing connection...");
                    control_tx.send(ControlMessage::Close()).ok();
                } else {
                    control_tx.send(ControlMessage::SendText(format!("Echoed: {}", text))).ok();
                }
            })
            .on_state_change(move |state| {
                println!("State: {}", state);
                if state == ConnectionState::Connected {
                    greeting_tx.send(ControlMessage::SendText("Hello from s9_ws_supervisor!".to_string())).ok();
                }
            })
            .on_error(|error| eprintln!("Error: {}", error))
            .on_close(|| println!("Connection closed")),
    );

    println!("Connecting to echo.websocket.org...");
    if !supervisor.connect("wss://echo.websocket.org", "demo-token", None) {
        return Err("could not launch connection attempt".into());
    }

    // Runs until the connection is closed for good
    supervisor.run();

    println!("Example completed successfully");
    Ok(())
}
