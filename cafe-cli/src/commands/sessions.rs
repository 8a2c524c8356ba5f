//! `cafe add|ls|get|rm|messages` (`spec.md` §6 / §4.2 / §4.4).

use cafe_types::CafeId;

use crate::error::CliError;
use crate::node::Node;

pub async fn add(node: &Node, url: String, token: String) -> Result<(), CliError> {
    let cafe_id = CafeId::from(url);
    let session = node.sessions.register(cafe_id.clone(), token).await?;
    println!("registered with {cafe_id}, session expires {}", session.expiry);
    Ok(())
}

pub async fn ls(node: &Node) -> Result<(), CliError> {
    let sessions = node.sessions.list().await?;
    if sessions.is_empty() {
        println!("no active sessions");
    }
    for session in sessions {
        println!("{}\texpires {}", session.cafe_id, session.expiry);
    }
    Ok(())
}

pub async fn get(node: &Node, cafe_id: String) -> Result<(), CliError> {
    let cafe_id = CafeId::from(cafe_id);
    match node.sessions.get(&cafe_id).await? {
        Some(session) => {
            println!("cafeId:  {}", session.cafe_id);
            println!("access:  {}", session.access);
            println!("refresh: {}", session.refresh);
            println!("expiry:  {}", session.expiry);
            Ok(())
        }
        None => Err(CliError::NoSuchCafe(cafe_id.0)),
    }
}

pub async fn rm(node: &Node, cafe_id: String) -> Result<(), CliError> {
    let cafe_id = CafeId::from(cafe_id);
    node.sessions.deregister(&cafe_id).await?;
    println!("deregistered {cafe_id}");
    Ok(())
}

pub async fn messages(node: &Node) -> Result<(), CliError> {
    node.inbox.check_all().await?;
    println!("checked mailbox for every active session");
    Ok(())
}
