//! Web server checks through `nikto -h <url>`.

use async_trait::async_trait;

use super::{process::run_tool, ToolAdapter, ToolKind, ToolPaths, ToolResult};

pub struct NiktoAdapter {
    binary: String,
}

impl NiktoAdapter {
    pub fn new(tools: &ToolPaths) -> Self {
        Self {
            binary: tools.nikto.clone(),
        }
    }

    fn args(url: &str) -> Vec<String> {
        vec!["-h".into(), url.into()]
    }
}

#[async_trait]
impl ToolAdapter for NiktoAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::Nikto
    }

    async fn run(&self, url: &str) -> ToolResult {
        run_tool(ToolKind::Nikto, &self.binary, &Self::args(url), None).await
    }
}
