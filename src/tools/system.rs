//! 系统探针能力：CPU、内存、磁盘、运行时长、当前时间
//!
//! 数据来自 sysinfo，时间格式化用 chrono。探针失败属于预期内的领域失败，返回 ToolOutcome::failure。

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use sysinfo::{Disks, System};

use crate::tools::{Capability, ParamKind, ParamSpec, Parameters, ToolOutcome};

const GB: f64 = 1024.0 * 1024.0 * 1024.0;

fn gb(bytes: u64) -> f64 {
    bytes as f64 / GB
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// get_cpu_usage：在最小采样间隔内测量整体 CPU 占用
pub struct CpuUsage;

impl Capability for CpuUsage {
    fn name(&self) -> &str {
        "get_cpu_usage"
    }

    fn description(&self) -> &str {
        "Report the current overall CPU load as a percentage."
    }

    fn invoke(&self, _params: &Parameters) -> anyhow::Result<ToolOutcome> {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_cpu_usage();
        let usage = sys.global_cpu_usage();
        Ok(ToolOutcome::success(format!("Current overall CPU load is {usage:.1}%.")))
    }
}

/// get_memory_info：物理内存占用
pub struct MemoryInfo;

impl Capability for MemoryInfo {
    fn name(&self) -> &str {
        "get_memory_info"
    }

    fn description(&self) -> &str {
        "Report physical memory usage (percent used, used GB, total GB)."
    }

    fn invoke(&self, _params: &Parameters) -> anyhow::Result<ToolOutcome> {
        let mut sys = System::new();
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            return Ok(ToolOutcome::failure("Error: Memory statistics are unavailable on this system."));
        }
        let used = sys.used_memory();
        Ok(ToolOutcome::success(format!(
            "System memory usage is {:.1}% ({:.2} GB used of {:.2} GB total).",
            percent(used, total),
            gb(used),
            gb(total)
        )))
    }
}

/// get_disk_usage：给定路径所在磁盘的占用
pub struct DiskUsage;

impl DiskUsage {
    /// 挂载点是该路径最长前缀的磁盘：(挂载点, total, available)
    fn disk_for(path: &Path) -> Option<(PathBuf, u64, u64)> {
        let disks = Disks::new_with_refreshed_list();
        disks
            .list()
            .iter()
            .filter(|d| path.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .map(|d| (d.mount_point().to_path_buf(), d.total_space(), d.available_space()))
    }
}

impl Capability for DiskUsage {
    fn name(&self) -> &str {
        "get_disk_usage"
    }

    fn description(&self) -> &str {
        "Report disk space usage for the filesystem containing a directory."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::optional("path", ParamKind::Path, "directory to check, defaults to /").with_default("/")]
    }

    fn invoke(&self, params: &Parameters) -> anyhow::Result<ToolOutcome> {
        let raw = params.get("path").and_then(|v| v.as_str()).unwrap_or("/");
        let path = Path::new(raw);
        if !path.exists() {
            return Ok(ToolOutcome::failure(format!("Error: The path '{raw}' does not exist.")));
        }
        if !path.is_dir() {
            return Ok(ToolOutcome::failure(format!("Error: The path '{raw}' is not a directory.")));
        }
        let canonical = path.canonicalize()?;
        let Some((mount, total, available)) = Self::disk_for(&canonical) else {
            return Ok(ToolOutcome::failure(format!("Error: No mounted disk found for '{raw}'.")));
        };
        let used = total.saturating_sub(available);
        Ok(ToolOutcome::success(format!(
            "Result: Disk space on '{raw}' (mounted at {}): {:.1}% occupied, {:.2} GB free of {:.2} GB.",
            mount.display(),
            percent(used, total),
            gb(available),
            gb(total)
        )))
    }
}

/// get_system_uptime：运行时长与上次启动时间
pub struct SystemUptime;

impl Capability for SystemUptime {
    fn name(&self) -> &str {
        "get_system_uptime"
    }

    fn description(&self) -> &str {
        "Report how long the system has been running and when it last booted."
    }

    fn invoke(&self, _params: &Parameters) -> anyhow::Result<ToolOutcome> {
        let uptime = System::uptime();
        let boot: Option<DateTime<Local>> = Local.timestamp_opt(System::boot_time() as i64, 0).single();
        let boot = boot
            .map(|b| b.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(ToolOutcome::success(format!(
            "Result: System uptime is {}. Last boot: {boot}.",
            format_uptime(uptime)
        )))
    }
}

/// 秒数 → `Xd Yh Zm Ws`
pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = secs % 86_400 / 3_600;
    let minutes = secs % 3_600 / 60;
    let seconds = secs % 60;
    format!("{days}d {hours}h {minutes}m {seconds}s")
}

/// get_current_datetime：本地日期时间（带时区偏移）
pub struct CurrentDatetime;

impl Capability for CurrentDatetime {
    fn name(&self) -> &str {
        "get_current_datetime"
    }

    fn description(&self) -> &str {
        "Report the current local date and time."
    }

    fn invoke(&self, _params: &Parameters) -> anyhow::Result<ToolOutcome> {
        let now = Local::now();
        Ok(ToolOutcome::success(format!(
            "According to the system clock, the current date and time is {}.",
            now.format("%A, %Y-%m-%d %H:%M:%S (UTC%:z)")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::OutcomeStatus;
    use serde_json::json;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(0), "0d 0h 0m 0s");
        assert_eq!(format_uptime(90_061), "1d 1h 1m 1s");
        assert_eq!(format_uptime(3_599), "0d 0h 59m 59s");
    }

    #[test]
    fn test_percent_handles_zero() {
        assert_eq!(percent(5, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }

    #[test]
    fn test_disk_usage_missing_path() {
        let params = json!({"path": "/definitely/not/here/familiar"}).as_object().cloned().unwrap();
        let out = DiskUsage.invoke(&params).unwrap();
        assert_eq!(out.status, OutcomeStatus::Failure);
        assert!(out.text.contains("does not exist"));
    }

    #[test]
    fn test_disk_usage_rejects_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().to_string();
        let params = json!({ "path": path }).as_object().cloned().unwrap();
        let out = DiskUsage.invoke(&params).unwrap();
        assert!(out.text.contains("not a directory"));
    }

    #[test]
    fn test_datetime_is_success() {
        let out = CurrentDatetime.invoke(&Parameters::new()).unwrap();
        assert!(out.is_success());
        assert!(out.text.contains("UTC"));
    }
}
