//! `gatewayctl`: a thin demonstration binary over the gateway core. It seeds
//! an in-memory store with a tenant/agent/session, issues one `send_message`
//! against it using the scripted vendor adapters, and prints the response
//! envelope as JSON.
//!
//! This is not the transport: there is no HTTP listener, no routing, no
//! auth header parsing. It exists purely to exercise the pipeline end to
//! end from a command line.

use chrono::Utc;
use clap::Parser;
use gateway::{
    build_pipeline, Agent, CliArgs, FallbackVendor, GatewayConfig, InMemoryStore, Session,
    SessionStatus, TenantScopedStore, Vendor,
};
use gateway_vendor::{NormalizedResponse, ScriptedAdapter, VendorRegistry};
use std::collections::HashMap;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    gateway::logging::init();

    let args = CliArgs::parse();
    let config = match GatewayConfig::load(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            std::process::exit(1);
        }
    };

    let store = Arc::new(InMemoryStore::new());
    let tenant = gateway::TenantId::new();

    let agent = Agent {
        id: gateway::AgentId::new(),
        tenant_id: tenant,
        name: "demo-agent".to_string(),
        primary_vendor: Vendor::VendorA,
        fallback_vendor: FallbackVendor::Vendor(Vendor::VendorB),
        system_prompt: "You are a helpful assistant.".to_string(),
        enabled_tools: vec![],
    };
    let session = Session {
        id: gateway::SessionId::new(),
        tenant_id: tenant,
        agent_id: agent.id,
        customer_id: "demo-customer".to_string(),
        status: SessionStatus::Active,
        created_at: Utc::now(),
        last_activity_at: Utc::now(),
        metadata: HashMap::new(),
    };
    let session_id = session.id;
    store.seed_agent(agent);
    store.seed_session(session);

    // A live deployment would call `gateway::http_vendor_registry(...)`
    // with real vendor base URLs/keys; the demonstration binary scripts
    // both vendors to succeed so it never makes a network call.
    let mut vendors = VendorRegistry::new();
    vendors.register(
        Vendor::VendorA,
        Arc::new(ScriptedAdapter::always_succeed(NormalizedResponse {
            text: format!("You said: {}", args.message),
            tokens_in: args.message.split_whitespace().count() as u64,
            tokens_out: 8,
            latency_ms: 20,
        })),
    );
    vendors.register(Vendor::VendorB, Arc::new(ScriptedAdapter::always_fail()));

    let pipeline = build_pipeline(store.clone(), vendors, &config);

    match pipeline
        .send(
            tenant,
            session_id,
            &args.idempotency_key,
            args.message.clone(),
            uuid::Uuid::new_v4().to_string(),
        )
        .await
    {
        Ok(envelope) => {
            println!("{}", serde_json::to_string_pretty(&envelope).unwrap());
        }
        Err(gateway::SendError::Gateway(err)) => {
            let envelope = err.to_envelope(uuid::Uuid::new_v4().to_string());
            eprintln!("{}", serde_json::to_string_pretty(&envelope).unwrap());
            std::process::exit(1);
        }
        Err(gateway::SendError::Cancelled) => {
            eprintln!("send cancelled");
            std::process::exit(1);
        }
    }

    let history = store.list_session_messages_ascending(tenant, session_id).await;
    eprintln!("--- session transcript ---");
    for message in history {
        eprintln!(
            "[{}] {:?}: {}",
            message.created_at.to_rfc3339(),
            message.role,
            message.content
        );
    }
}
