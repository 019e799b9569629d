// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The shopping assistant's request loop.
//!
//! One [`ChatEngine::handle`] call binds the request to a session, mirrors
//! any cart the client sent, answers control messages directly, and
//! otherwise runs a two-pass function-calling exchange with the provider:
//! the first call may request tools, the second turns their results into
//! prose.

use std::sync::Arc;

use autospares_config::model::ChatConfig;
use autospares_core::types::{
    CartLine, ChatRole, ProductQuery, ProviderRequest, Turn, TurnRole,
};
use autospares_core::{ProviderAdapter, StorageAdapter, StoreError, format_ksh};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::cart::CartService;
use crate::history::{self, ToolResult};
use crate::session::{self, ResolvedSession, SessionRequest, SessionResolver, WELCOME_TITLE};
use crate::tools::cart::cart_status_json;
use crate::tools::{ToolContext, ToolRegistry, ToolServices, register_builtins};

/// Asks for the welcome message with product picks.
pub const INITIAL_RECOMMENDATIONS: &str = "GET_INITIAL_RECOMMENDATIONS";
/// Confirms a cart sync carried by the same request.
pub const SYNC_CART: &str = "SYNC_CART";
/// Asks for a plain-text cart summary.
pub const CART_STATUS: &str = "GET_CART_STATUS";

pub const WELCOME_WITH_PICKS: &str = "Welcome to AutoSpares Kenya! Here are some popular auto parts to get you started. What are you looking for today?";
pub const WELCOME_PLAIN: &str = "Welcome to AutoSpares Kenya! I'm here to help you find the perfect auto parts for your vehicle.";
pub const CART_SYNCED: &str = "Cart synchronized successfully.";
pub const CART_EMPTY: &str = "Your cart is currently empty.";
pub const CART_ERROR: &str = "Error processing cart operation.";
pub const DEFAULT_REPLY: &str =
    "I'm here to help you find auto parts! What specific parts are you looking for your vehicle?";
/// Shown to the customer when the request fails.
pub const APOLOGY: &str = "I'm sorry, I encountered an error. Please try again or contact support if the issue persists.";

/// An inbound chat message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
    pub session_token: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_initial_load: bool,
    pub cart_items: Option<Vec<CartLine>>,
}

impl ChatRequest {
    fn is_welcome(&self) -> bool {
        self.is_initial_load || self.message.trim() == INITIAL_RECOMMENDATIONS
    }

    fn is_control(&self) -> bool {
        self.is_welcome() || matches!(self.message.trim(), SYNC_CART | CART_STATUS)
    }
}

/// The assistant's answer plus the session the client must keep using.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub tool_results: Vec<ToolResult>,
    pub session_id: String,
    pub session_token: String,
}

/// Coordinates sessions, cart mirroring, tools and the provider.
pub struct ChatEngine {
    provider: Arc<dyn ProviderAdapter>,
    storage: Arc<dyn StorageAdapter>,
    sessions: SessionResolver,
    cart: CartService,
    tools: ToolRegistry,
    config: ChatConfig,
}

impl ChatEngine {
    /// Builds an engine with every built-in tool registered.
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        services: ToolServices,
        config: ChatConfig,
    ) -> Self {
        let mut tools = ToolRegistry::new();
        register_builtins(&mut tools, &services);
        info!(tools = tools.len(), "chat engine ready");
        Self {
            provider,
            sessions: SessionResolver::new(services.storage.clone()),
            storage: services.storage,
            cart: services.cart,
            tools,
            config,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn sessions(&self) -> &SessionResolver {
        &self.sessions
    }

    /// Handles one chat request end to end.
    pub async fn handle(&self, request: ChatRequest) -> Result<ChatReply, StoreError> {
        let message = request.message.trim().to_string();
        if message.is_empty() && !request.is_initial_load {
            return Err(StoreError::Validation("message is required".into()));
        }

        let control = request.is_control();
        let session = self
            .sessions
            .resolve(SessionRequest {
                session_id: request.session_id.clone(),
                session_token: request.session_token.clone(),
                email: request.email.clone(),
                phone: request.phone.clone(),
                new_title: if control {
                    WELCOME_TITLE.to_string()
                } else {
                    session::title_from_message(&message)
                },
                title_update: (!control).then(|| session::title_from_message(&message)),
            })
            .await?;

        if let Some(items) = request.cart_items.clone()
            && let Err(e) = self.cart.sync(&session.session_id, items).await
        {
            warn!(session_id = %session.session_id, error = %e, "cart sync with chat request failed");
        }

        if request.is_welcome() {
            return Ok(self.welcome(session).await);
        }
        match message.as_str() {
            SYNC_CART => return Ok(reply(session, CART_SYNCED.into(), Vec::new())),
            CART_STATUS => return Ok(self.cart_status(session).await),
            _ => {}
        }

        self.converse(session, &message).await
    }

    async fn welcome(&self, session: ResolvedSession) -> ChatReply {
        let pool = self
            .storage
            .list_products(&ProductQuery {
                limit: self.config.recommendation_pool,
                ..Default::default()
            })
            .await;

        let (text, tool_results) = match pool {
            Ok(mut products) => {
                products.shuffle(&mut rand::thread_rng());
                products.truncate(self.config.recommendation_count);
                match serde_json::to_value(&products) {
                    Ok(picks) => (
                        WELCOME_WITH_PICKS,
                        vec![ToolResult::ok(
                            "get_products",
                            json!({ "limit": self.config.recommendation_pool }),
                            picks,
                        )],
                    ),
                    Err(e) => {
                        warn!(error = %e, "could not encode recommendations");
                        (WELCOME_PLAIN, Vec::new())
                    }
                }
            }
            Err(e) => {
                warn!(session_id = %session.session_id, error = %e, "recommendations unavailable");
                (WELCOME_PLAIN, Vec::new())
            }
        };

        self.persist(&session.session_id, ChatRole::Assistant, text, &tool_results)
            .await;
        reply(session, text.into(), tool_results)
    }

    async fn cart_status(&self, session: ResolvedSession) -> ChatReply {
        let summary = match self.cart.summary(&session.session_id).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(session_id = %session.session_id, error = %e, "cart status failed");
                return reply(session, CART_ERROR.into(), Vec::new());
            }
        };

        let text = if summary.has_items {
            let lines: Vec<String> = summary
                .items
                .iter()
                .map(|l| {
                    format!(
                        "• {} - {} (Qty: {})",
                        l.product_name,
                        format_ksh(l.unit_price),
                        l.quantity
                    )
                })
                .collect();
            format!(
                "You have {} item(s) in your cart:\n\n{}\n\nTotal: {}",
                summary.total_items,
                lines.join("\n"),
                summary.formatted_total
            )
        } else {
            CART_EMPTY.to_string()
        };

        let result = ToolResult::ok("get_cart_status", json!({}), cart_status_json(&summary));
        reply(session, text, vec![result])
    }

    async fn converse(
        &self,
        session: ResolvedSession,
        message: &str,
    ) -> Result<ChatReply, StoreError> {
        let history = self
            .storage
            .recent_messages(&session.session_id, self.config.history_limit)
            .await?;
        let mut turns = history::to_turns(&history);
        turns.push(Turn::user_text(message));
        debug!(
            session_id = %session.session_id,
            history = history.len(),
            "calling provider"
        );

        let first = self
            .provider
            .complete(ProviderRequest {
                system_instruction: None,
                turns: turns.clone(),
                tools: self.tools.tool_definitions(),
            })
            .await?;

        let ctx = ToolContext {
            session_id: session.session_id.clone(),
        };
        let mut tool_results = Vec::new();
        for call in first.function_calls() {
            tool_results.push(self.run_tool(&ctx, &call.name, call.args).await);
        }

        let mut text = first.text();
        if !tool_results.is_empty() {
            turns.push(Turn {
                role: TurnRole::Model,
                parts: first.parts.clone(),
            });
            turns.push(history::function_responses(&tool_results));
            match self
                .provider
                .complete(ProviderRequest {
                    system_instruction: None,
                    turns,
                    tools: Vec::new(),
                })
                .await
            {
                Ok(second) => {
                    if let Some(follow_up) = second.text() {
                        text = Some(follow_up);
                    }
                }
                Err(e) => {
                    warn!(session_id = %session.session_id, error = %e, "follow-up generation failed");
                }
            }
        }

        let response = text.unwrap_or_else(|| DEFAULT_REPLY.to_string());
        self.persist(&session.session_id, ChatRole::User, message, &[])
            .await;
        self.persist(&session.session_id, ChatRole::Assistant, &response, &tool_results)
            .await;

        info!(
            session_id = %session.session_id,
            tools = tool_results.len(),
            "chat turn complete"
        );
        Ok(reply(session, response, tool_results))
    }

    async fn run_tool(
        &self,
        ctx: &ToolContext,
        name: &str,
        args: serde_json::Value,
    ) -> ToolResult {
        let Some(tool) = self.tools.get(name) else {
            warn!(tool = name, "model called an unknown tool");
            return ToolResult::failed(name, args, format!("Unknown tool: {name}"));
        };
        match tool.invoke(ctx, args.clone()).await {
            Ok(output) if output.is_error => {
                let message = match output.content {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                ToolResult::failed(name, args, message)
            }
            Ok(output) => {
                debug!(tool = name, "tool succeeded");
                ToolResult::ok(name, args, output.content)
            }
            Err(e) => {
                warn!(tool = name, error = %e, "tool failed");
                ToolResult::failed(name, args, e.to_string())
            }
        }
    }

    /// Appends to the message log. Failures are logged, not returned.
    async fn persist(
        &self,
        session_id: &str,
        role: ChatRole,
        content: &str,
        results: &[ToolResult],
    ) {
        let metadata = match role {
            ChatRole::User => None,
            ChatRole::Assistant => match history::encode_metadata(results) {
                Ok(m) => Some(m),
                Err(e) => {
                    warn!(error = %e, "could not encode tool results");
                    None
                }
            },
        };
        let message = history::new_message(session_id, role, content, metadata);
        if let Err(e) = self.storage.insert_message(&message).await {
            warn!(session_id, role = %role, error = %e, "message not stored");
        }
    }
}

fn reply(session: ResolvedSession, response: String, tool_results: Vec<ToolResult>) -> ChatReply {
    ChatReply {
        response,
        tool_results,
        session_id: session.session_id,
        session_token: session.session_token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autospares_config::model::CheckoutConfig;
    use autospares_core::types::{Product, TurnPart};
    use autospares_test_utils::mock_payment::MockPaymentGateway;
    use autospares_test_utils::mock_provider::{MockProvider, function_call};
    use autospares_test_utils::storage::temp_storage;

    use crate::checkout::OrderService;
    use crate::events::CartEvents;
    use crate::payments::PaymentService;

    struct Fixture {
        engine: ChatEngine,
        provider: Arc<MockProvider>,
        storage: Arc<dyn StorageAdapter>,
        _dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let (storage, dir) = temp_storage().await;
        let provider = Arc::new(MockProvider::new());
        let services = ToolServices {
            cart: CartService::new(storage.clone(), CartEvents::new()),
            orders: OrderService::new(storage.clone(), CheckoutConfig::default()),
            payments: PaymentService::new(storage.clone(), Arc::new(MockPaymentGateway::new())),
            storage: storage.clone(),
        };
        let engine = ChatEngine::new(provider.clone(), services, ChatConfig::default());
        Fixture {
            engine,
            provider,
            storage,
            _dir: dir,
        }
    }

    fn product(id: &str, name: &str) -> Product {
        Product {
            id: id.into(),
            sku: format!("SKU-{id}"),
            name: name.into(),
            brand: Some("NGK".into()),
            description: None,
            category: Some("engine".into()),
            part_number: None,
            price: 850.0,
            sale_price: None,
            stock_quantity: 12,
            is_active: true,
            image_url: None,
        }
    }

    fn line(id: &str, name: &str, qty: u32, price: f64) -> CartLine {
        CartLine {
            product_id: id.into(),
            product_name: name.into(),
            brand: None,
            quantity: qty,
            unit_price: price,
            image_url: None,
        }
    }

    fn message(text: &str) -> ChatRequest {
        ChatRequest {
            message: text.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let f = fixture().await;
        let err = f.engine.handle(message("   ")).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn welcome_picks_three_and_persists_only_assistant() {
        let f = fixture().await;
        for i in 0..6 {
            f.storage
                .upsert_product(&product(&format!("p{i}"), &format!("Part {i}")))
                .await
                .unwrap();
        }

        let reply = f
            .engine
            .handle(ChatRequest {
                is_initial_load: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(reply.response, WELCOME_WITH_PICKS);
        assert_eq!(reply.tool_results.len(), 1);
        assert_eq!(reply.tool_results[0].tool, "get_products");
        assert_eq!(reply.tool_results[0].args, json!({"limit": 10}));
        let picks = reply.tool_results[0].result.as_ref().unwrap();
        assert_eq!(picks.as_array().unwrap().len(), 3);

        let log = f.storage.recent_messages(&reply.session_id, 10).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].role, "assistant");

        let session = f.storage.get_session(&reply.session_id).await.unwrap().unwrap();
        assert_eq!(session.title.as_deref(), Some(WELCOME_TITLE));
        assert!(f.provider.requests().await.is_empty());
    }

    #[tokio::test]
    async fn sync_cart_control_message_stores_cart() {
        let f = fixture().await;
        let reply = f
            .engine
            .handle(ChatRequest {
                message: SYNC_CART.into(),
                cart_items: Some(vec![line("p1", "Brake Pads", 2, 2500.0)]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(reply.response, CART_SYNCED);
        assert!(reply.tool_results.is_empty());

        let cart = f.storage.get_cart(&reply.session_id).await.unwrap();
        assert_eq!(cart.len(), 1);
        assert!(f.storage.recent_messages(&reply.session_id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cart_status_lists_items() {
        let f = fixture().await;
        let reply = f
            .engine
            .handle(ChatRequest {
                message: CART_STATUS.into(),
                cart_items: Some(vec![
                    line("p1", "Brake Pads", 2, 2500.0),
                    line("p2", "Wiper Blade", 1, 650.0),
                ]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            reply.response,
            "You have 3 item(s) in your cart:\n\n\
             • Brake Pads - KSh 2,500 (Qty: 2)\n\
             • Wiper Blade - KSh 650 (Qty: 1)\n\n\
             Total: KSh 5,650"
        );
        assert_eq!(reply.tool_results[0].tool, "get_cart_status");

        let empty = f
            .engine
            .handle(ChatRequest {
                message: CART_STATUS.into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(empty.response, CART_EMPTY);
    }

    #[tokio::test]
    async fn tool_call_runs_second_pass_without_tools() {
        let f = fixture().await;
        f.storage.upsert_product(&product("p1", "Spark Plug")).await.unwrap();
        f.provider
            .push_response(function_call("search_products", json!({"query": "spark"})))
            .await;
        f.provider.push_text("We have NGK spark plugs at KSh 850.").await;

        let reply = f.engine.handle(message("spark plugs for a Vitz?")).await.unwrap();
        assert_eq!(reply.response, "We have NGK spark plugs at KSh 850.");
        assert_eq!(reply.tool_results.len(), 1);
        assert_eq!(reply.tool_results[0].result.as_ref().unwrap()[0]["id"], "p1");

        let requests = f.provider.requests().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.len(), 8);
        assert!(requests[1].tools.is_empty());
        let last = requests[1].turns.last().unwrap();
        assert_eq!(last.role, TurnRole::User);
        assert!(matches!(
            &last.parts[0],
            TurnPart::FunctionResponse { name, .. } if name == "search_products"
        ));

        let log = f.storage.recent_messages(&reply.session_id, 10).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].role, "user");
        assert_eq!(history::decode_tool_results(&log[1]), reply.tool_results);

        let session = f.storage.get_session(&reply.session_id).await.unwrap().unwrap();
        assert_eq!(session.title.as_deref(), Some("spark plugs for a Vitz?"));
    }

    #[tokio::test]
    async fn unknown_tool_error_is_reported_back() {
        let f = fixture().await;
        f.provider
            .push_response(function_call("get_vehicle_compatibility", json!({})))
            .await;
        f.provider.push_text("I can't check compatibility yet.").await;

        let reply = f.engine.handle(message("does it fit?")).await.unwrap();
        assert_eq!(
            reply.tool_results[0].error.as_deref(),
            Some("Unknown tool: get_vehicle_compatibility")
        );
        assert_eq!(reply.response, "I can't check compatibility yet.");
    }

    #[tokio::test]
    async fn failed_second_pass_keeps_first_text() {
        let f = fixture().await;
        let mut first = function_call("get_cart_status", json!({}));
        first.parts.insert(0, TurnPart::text("Checking your cart."));
        f.provider.push_response(first).await;
        f.provider.push_error("quota exhausted").await;

        let reply = f.engine.handle(message("what is in my cart")).await.unwrap();
        assert_eq!(reply.response, "Checking your cart.");
        assert_eq!(reply.tool_results.len(), 1);
    }

    #[tokio::test]
    async fn no_text_falls_back_to_default() {
        let f = fixture().await;
        f.provider
            .push_response(autospares_core::types::ProviderResponse::default())
            .await;
        let reply = f.engine.handle(message("hello")).await.unwrap();
        assert_eq!(reply.response, DEFAULT_REPLY);
    }

    #[tokio::test]
    async fn provider_failure_is_an_error() {
        let f = fixture().await;
        f.provider.push_error("503 unavailable").await;
        let err = f.engine.handle(message("hello")).await.unwrap_err();
        assert!(matches!(err, StoreError::Provider { .. }));
    }

    #[tokio::test]
    async fn history_is_replayed_on_the_next_turn() {
        let f = fixture().await;
        f.provider.push_text("Which car do you drive?").await;
        let first = f.engine.handle(message("I need brake pads")).await.unwrap();

        f.provider.push_text("Noted, a Probox.").await;
        let second = f
            .engine
            .handle(ChatRequest {
                message: "Toyota Probox".into(),
                session_token: Some(first.session_token.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(second.session_id, first.session_id);

        let requests = f.provider.requests().await;
        let turns = &requests[1].turns;
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0], Turn::user_text("I need brake pads"));
        assert_eq!(turns[1], Turn::model_text("Which car do you drive?"));
        assert_eq!(turns[2], Turn::user_text("Toyota Probox"));
    }
}
