//! `cafe queue flush|run` (`spec.md` §4.3 `Flush`/`Run`).

use crate::error::CliError;
use crate::node::Node;

pub async fn flush(node: &Node) -> Result<(), CliError> {
    let dispatched = node.queue.flush().await?;
    println!("dispatched {dispatched} group(s)");
    Ok(())
}

/// Runs the queue's dispatch loop and the inbox poller side by side until
/// `Ctrl-C`, then cancels both cooperatively (`spec.md` §4.3 `Stop`).
pub async fn run(node: &Node) -> Result<(), CliError> {
    let queue = node.queue.clone();
    let inbox = node.inbox.clone();

    let queue_handle = tokio::spawn(async move { queue.run().await });
    let inbox_handle = tokio::spawn(async move { inbox.run().await });

    tokio::signal::ctrl_c().await.ok();
    println!("stopping...");
    node.queue.stop();
    node.inbox.stop();

    let _ = tokio::join!(queue_handle, inbox_handle);
    Ok(())
}
