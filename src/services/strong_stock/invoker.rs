//! 外部进程获取
//!
//! 启动一个独立进程执行同样的获取逻辑，捕获其标准输出、标准错误和退出码。
//! 退出码非零不视为错误，由调用方结合输出判断。

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

use crate::config::FallbackConfig;

/// 外部进程的执行结果
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutput {
    /// 退出码，被信号终止时为 -1
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl FetchOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("启动外部进程 {program} 失败: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("外部进程 {program} 超时（{secs} 秒），已终止")]
    Timeout { program: String, secs: u64 },
}

/// 外部获取能力
#[async_trait]
pub trait ExternalFetcher: Send + Sync {
    async fn run(&self) -> Result<FetchOutput, InvokeError>;
}

/// 通过子进程执行获取
#[derive(Debug, Clone)]
pub struct CommandFetcher {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandFetcher {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// 根据配置构造，未指定程序时使用当前可执行文件
    pub fn from_config(config: &FallbackConfig) -> std::io::Result<Self> {
        let program = match &config.program {
            Some(p) if !p.is_empty() => p.clone(),
            _ => std::env::current_exe()?.to_string_lossy().into_owned(),
        };
        Ok(Self::new(
            program,
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        ))
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn execute(&self) -> Result<FetchOutput, InvokeError> {
        log::info!("执行外部获取命令: {}", self.command_line());

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| InvokeError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        // 超时后 future 被丢弃，kill_on_drop 负责终止子进程
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| InvokeError::Spawn {
                program: self.program.clone(),
                source,
            })?,
            Err(_) => {
                return Err(InvokeError::Timeout {
                    program: self.program.clone(),
                    secs: self.timeout.as_secs(),
                })
            }
        };

        let result = FetchOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        log::info!(
            "外部进程退出码: {}，stdout {} 字节，stderr {} 字节",
            result.exit_code,
            result.stdout.len(),
            result.stderr.len()
        );
        Ok(result)
    }
}

#[async_trait]
impl ExternalFetcher for CommandFetcher {
    async fn run(&self) -> Result<FetchOutput, InvokeError> {
        self.execute().await
    }
}
