// src/recorder.rs
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use anyhow::Context;
use crate::drivers::{Report, ReportSink, VitalsError};

// 每份报告写成一行 JSON, 追加到文件末尾
pub struct JsonLinesSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening report file {}", path.display()))?;
        log::info!("reports will be appended to {}", path.display());
        Ok(Self { path, writer: BufWriter::new(file) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for JsonLinesSink {
    fn save(&mut self, report: &Report) -> Result<(), VitalsError> {
        serde_json::to_writer(&mut self.writer, report)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

// 内存中的报告存储, 测试和演示用; 克隆共享同一份列表
#[derive(Clone, Default)]
pub struct MemorySink {
    reports: Arc<Mutex<Vec<Report>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl ReportSink for MemorySink {
    fn save(&mut self, report: &Report) -> Result<(), VitalsError> {
        self.reports
            .lock()
            .map_err(|_| VitalsError::Persistence("report store poisoned".into()))?
            .push(report.clone());
        Ok(())
    }
}
