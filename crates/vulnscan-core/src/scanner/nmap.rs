//! Port and service scan through `nmap -sV`.

use async_trait::async_trait;

use super::{process::run_tool, ToolAdapter, ToolKind, ToolPaths, ToolResult};

pub struct NmapAdapter {
    binary: String,
}

impl NmapAdapter {
    pub fn new(tools: &ToolPaths) -> Self {
        Self {
            binary: tools.nmap.clone(),
        }
    }

    fn args(host: &str) -> Vec<String> {
        vec!["-sV".into(), host.into()]
    }
}

#[async_trait]
impl ToolAdapter for NmapAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::Nmap
    }

    async fn run(&self, host: &str) -> ToolResult {
        run_tool(ToolKind::Nmap, &self.binary, &Self::args(host), None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_service_detection_args() {
        assert_eq!(NmapAdapter::args("10.0.0.1"), vec!["-sV", "10.0.0.1"]);
    }

    #[tokio::test]
    async fn missing_binary_is_reported_inline() {
        let tools = ToolPaths {
            nmap: "/nonexistent/nmap".into(),
            ..ToolPaths::default()
        };
        let result = NmapAdapter::new(&tools).run("127.0.0.1").await;
        assert_eq!(result.tool, ToolKind::Nmap);
        assert!(!result.success);
        assert!(!result.output.is_empty());
    }
}
