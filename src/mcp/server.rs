//! MCP server bootstrap and request dispatch.

use std::{borrow::Cow, sync::Arc};

use crate::{
    config::get_config,
    mcp::{
        format::{
            health_snapshot, json_resource_contents, serialize_json, settings_snapshot,
            usage_payload,
        },
        handlers::{
            ask::{handle_ask, handle_recall},
            document::{handle_reset, handle_upload},
            metrics::handle_metrics,
        },
        registry, schemas,
    },
    processing::DocumentService,
};
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, JsonObject, ListResourcesResult,
        ListToolsResult, RawResource, ReadResourceRequestParam, ReadResourceResult, Resource,
        ServerCapabilities, ServerInfo, Tool, ToolAnnotations,
    },
};

const HEALTH_URI: &str = "mcp://health";
const SETTINGS_URI: &str = "mcp://settings";
const USAGE_URI: &str = "mcp://usage";

/// MCP server implementation exposing the document QA operations.
#[derive(Clone)]
pub struct DocQaMcpServer {
    service: Arc<DocumentService>,
    registry: Arc<registry::Registry>,
}

impl DocQaMcpServer {
    /// Create a new MCP server around the shared document service.
    pub fn new(service: Arc<DocumentService>) -> Self {
        let mut registry = registry::Registry::default();
        registry.register_resource(HEALTH_URI, resource_health);
        registry.register_resource(SETTINGS_URI, resource_settings);
        registry.register_resource(USAGE_URI, resource_usage);

        registry.register_tool("upload", tool_upload);
        registry.register_tool("ask", tool_ask);
        registry.register_tool("recall", tool_recall);
        registry.register_tool("reset", tool_reset);
        registry.register_tool("metrics", tool_metrics);

        Self {
            service,
            registry: Arc::new(registry),
        }
    }

    fn describe_tools(&self) -> Vec<Tool> {
        let top_k = get_config().search_top_k;
        vec![
            tool(
                "ask",
                "Ask Document",
                "Answer a question strictly from the loaded document; choose a mode for notes, bullets or a summary.",
                schemas::ask_input_schema(),
                ToolAnnotations::with_title("Ask Document")
                    .read_only(true)
                    .idempotent(false)
                    .open_world(true),
            ),
            tool(
                "upload",
                "Load Document",
                "Load a local .pdf or .txt file; it replaces whatever document was loaded before.",
                schemas::upload_input_schema(),
                ToolAnnotations::with_title("Load Document")
                    .destructive(true)
                    .idempotent(false)
                    .open_world(false),
            ),
            tool(
                "recall",
                "Recall Chunks",
                "Show the raw document chunks nearest to a query, without generating an answer.",
                schemas::recall_input_schema(top_k),
                ToolAnnotations::with_title("Recall Chunks")
                    .read_only(true)
                    .idempotent(true)
                    .open_world(false),
            ),
            tool(
                "reset",
                "Reset Document",
                "Drop the loaded document.",
                schemas::empty_object_schema(),
                ToolAnnotations::with_title("Reset Document")
                    .destructive(true)
                    .idempotent(true)
                    .open_world(false),
            ),
            tool(
                "metrics",
                "Metrics Snapshot",
                "Check upload volume, questions answered and generation calls at a glance.",
                schemas::empty_object_schema(),
                ToolAnnotations::with_title("Metrics Snapshot")
                    .read_only(true)
                    .idempotent(true)
                    .open_world(false),
            ),
        ]
    }

    fn describe_resources(&self) -> Vec<Resource> {
        let mut health = RawResource::new(HEALTH_URI, "health");
        health.description = Some("Provider configuration and the loaded document".into());

        let mut settings = RawResource::new(SETTINGS_URI, "settings");
        settings.description = Some("Effective chunking and retrieval limits".into());

        let mut usage = RawResource::new(USAGE_URI, "usage");
        usage.description =
            Some("Recommended tool flow: upload, then ask; recall to debug retrieval.".into());

        vec![
            health.no_annotation(),
            settings.no_annotation(),
            usage.no_annotation(),
        ]
    }
}

fn tool(
    name: &'static str,
    title: &str,
    description: &'static str,
    input_schema: JsonObject,
    annotations: ToolAnnotations,
) -> Tool {
    Tool {
        name: Cow::Borrowed(name),
        title: Some(title.to_string()),
        description: Some(Cow::Borrowed(description)),
        input_schema: Arc::new(input_schema),
        output_schema: None,
        annotations: Some(annotations),
        icons: None,
    }
}

fn resource_health(
    server: &DocQaMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    let service = server.service.clone();
    Box::pin(async move {
        let payload = health_snapshot(get_config(), service.index_status());
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                HEALTH_URI,
                serialize_json(&payload, HEALTH_URI),
            )],
        })
    })
}

fn resource_settings(
    _server: &DocQaMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    Box::pin(async move {
        let payload = settings_snapshot(get_config());
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                SETTINGS_URI,
                serialize_json(&payload, SETTINGS_URI),
            )],
        })
    })
}

fn resource_usage(
    _server: &DocQaMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    Box::pin(async move {
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                USAGE_URI,
                serialize_json(&usage_payload(), USAGE_URI),
            )],
        })
    })
}

fn tool_upload(server: &DocQaMcpServer, request: CallToolRequestParam) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_upload(&service, request.arguments).await })
}

fn tool_ask(server: &DocQaMcpServer, request: CallToolRequestParam) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_ask(&service, request.arguments).await })
}

fn tool_recall(server: &DocQaMcpServer, request: CallToolRequestParam) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_recall(&service, request.arguments).await })
}

fn tool_reset(server: &DocQaMcpServer, _request: CallToolRequestParam) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_reset(&service).await })
}

fn tool_metrics(server: &DocQaMcpServer, _request: CallToolRequestParam) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_metrics(&service).await })
}

impl ServerHandler for DocQaMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut implementation = rmcp::model::Implementation::from_build_env();
        implementation.name = "docqa".to_string();
        implementation.title = Some("Document QA MCP".to_string());
        implementation.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: implementation,
            instructions: Some(
                "Use this server to answer questions about one document. Load it with `upload`, then call `ask`; answers are grounded in the loaded document only.".into(),
            ),
            ..ServerInfo::default()
        }
    }

    fn list_resources(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        let resources = self.describe_resources();
        std::future::ready(Ok(ListResourcesResult::with_all_items(resources)))
    }

    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools = self.describe_tools();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.resource(request.uri.as_str()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown resource URI: {}", request.uri),
                None,
            ))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.tool(request.name.as_ref()) {
                tracing::debug!(tool = %request.name, "Dispatching MCP tool");
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            ))
        }
    }
}
