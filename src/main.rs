// ==========================================
// 工艺路线编排系统 - 命令行入口
// ==========================================
// 用法:
//   routing-designer <draft.json> [--format csv|json] [--config path] [--json-log]
//
// 读取工艺路线草稿，按配置解析导出列，结果写到 stdout（日志写到 stderr）
// ==========================================

use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use routing_designer::config::ConfigManager;
use routing_designer::domain::{DragPayload, ExportFormat};
use routing_designer::importer::CandidateMapper;
use routing_designer::{app::AppState, i18n, logging};

const USAGE: &str =
    "用法: routing-designer <draft.json> [--format csv|json] [--config path] [--json-log]";

struct CliArgs {
    draft_path: PathBuf,
    format: Option<ExportFormat>,
    config_path: Option<PathBuf>,
    json_log: bool,
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let mut draft_path = None;
    let mut format = None;
    let mut config_path = None;
    let mut json_log = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--format" | "-f" => {
                let raw = args.next().ok_or_else(|| anyhow!("--format 缺少参数\n{}", USAGE))?;
                format = Some(ExportFormat::from_str(&raw).map_err(|e| anyhow!(e))?);
            }
            "--config" | "-c" => {
                let raw = args.next().ok_or_else(|| anyhow!("--config 缺少参数\n{}", USAGE))?;
                config_path = Some(PathBuf::from(raw));
            }
            "--json-log" => json_log = true,
            "--help" | "-h" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            other if other.starts_with('-') => bail!("未知参数: {}\n{}", other, USAGE),
            other => {
                if draft_path.replace(PathBuf::from(other)).is_some() {
                    bail!("只能指定一个草稿文件\n{}", USAGE);
                }
            }
        }
    }

    Ok(CliArgs {
        draft_path: draft_path.ok_or_else(|| anyhow!("缺少草稿文件\n{}", USAGE))?,
        format,
        config_path,
        json_log,
    })
}

fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    if args.json_log {
        logging::init_json();
    } else {
        logging::init();
    }
    tracing::info!(version = routing_designer::VERSION, "{}", routing_designer::APP_NAME);

    let config_manager = match &args.config_path {
        Some(path) => ConfigManager::load_from_path(path)
            .map_err(|e| anyhow!("配置加载失败 ({}): {}", path.display(), e))?,
        None => ConfigManager::load_default(),
    };
    i18n::set_locale(&config_manager.config().locale);

    let draft = CandidateMapper
        .load_draft(&args.draft_path)
        .with_context(|| format!("草稿读取失败: {}", args.draft_path.display()))?;

    let mut state = AppState::in_memory(config_manager.config().clone());
    let format = args
        .format
        .unwrap_or(state.config().default_export_format);

    let item_code = draft.candidate.item_code.clone();
    let workspace = state.activate_item(&item_code);
    for operation in &draft.candidate.operations {
        let payload = DragPayload::new(
            item_code.as_str(),
            draft.candidate.candidate_id.as_deref(),
            operation.clone(),
        );
        workspace.insert(&payload, None);
    }

    let mut resolution = workspace
        .resolution_config()
        .with_mapping_rows(draft.mapping.clone());
    if let Some(group) = draft.process_group.clone() {
        resolution = resolution.with_process_group(group);
    }

    let workspace = state
        .active()
        .ok_or_else(|| anyhow!("活动物料不存在: {}", item_code))?;
    let bytes = state.export_api.export(workspace, &resolution, format)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&bytes)?;
    if !bytes.ends_with(b"\n") {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}
