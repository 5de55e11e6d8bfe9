//! CLI argument surface (spec §6 "CLI surface"), parsed once into typed
//! structs the same way the teacher's `Args: TryFrom<&clap::ArgMatches>`
//! pattern does.

use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};

pub fn command() -> Command {
    Command::new(clap::crate_name!())
        .version(clap::crate_version!())
        .author(clap::crate_authors!())
        .about(clap::crate_description!())
        .subcommand_required(true)
        .subcommand(
            Command::new("mod")
                .about("render and manage module releases")
                .subcommand_required(true)
                .subcommands([build_cmd(), apply_cmd(), diff_cmd(), delete_cmd(), status_cmd()]),
        )
}

fn common_args() -> Vec<Arg> {
    vec![
        Arg::new("values").short('f').long("values").action(ArgAction::Append).help("values file(s), applied in order"),
        Arg::new("namespace").short('n').long("namespace").default_value("default"),
        Arg::new("provider").long("provider").required(true).help("path to the provider catalog document"),
        Arg::new("kubeconfig").long("kubeconfig").env("KUBECONFIG"),
        Arg::new("context").long("context").help("kubeconfig context to use"),
    ]
}

fn build_cmd() -> Command {
    Command::new("build")
        .about("render a module to manifests without touching the cluster")
        .arg(Arg::new("path").default_value("."))
        .args(common_args())
        .arg(Arg::new("output").long("output").short('o').default_value("yaml").value_parser(["yaml", "json"]))
        .arg(Arg::new("split").long("split").action(ArgAction::SetTrue).help("write one file per resource"))
        .arg(Arg::new("name").long("name").required(true))
        .arg(Arg::new("out-dir").long("out-dir").default_value("."))
}

fn apply_cmd() -> Command {
    Command::new("apply")
        .about("render, apply, and record a release")
        .arg(Arg::new("path").default_value("."))
        .args(common_args())
        .arg(Arg::new("dry-run").long("dry-run").action(ArgAction::SetTrue))
        .arg(Arg::new("create-namespace").long("create-namespace").action(ArgAction::SetTrue))
        .arg(Arg::new("force").long("force").action(ArgAction::SetTrue).help("allow an empty render to prune a non-empty release"))
        .arg(Arg::new("prune-namespaces").long("prune-namespaces").action(ArgAction::SetTrue))
        .arg(Arg::new("name").long("name").required(true))
}

fn diff_cmd() -> Command {
    Command::new("diff")
        .about("render and compare against the live cluster state")
        .arg(Arg::new("path").default_value("."))
        .args(common_args())
        .arg(Arg::new("name").long("name").required(true))
}

fn release_selector_args() -> Vec<Arg> {
    vec![
        Arg::new("release-name").long("release-name").conflicts_with("release-id"),
        Arg::new("release-id").long("release-id").conflicts_with("release-name"),
        Arg::new("namespace").short('n').long("namespace").required(true),
        Arg::new("kubeconfig").long("kubeconfig").env("KUBECONFIG"),
        Arg::new("context").long("context"),
    ]
}

fn delete_cmd() -> Command {
    Command::new("delete")
        .about("delete a release's tracked resources")
        .args(release_selector_args())
        .arg(Arg::new("ignore-not-found").long("ignore-not-found").action(ArgAction::SetTrue))
}

fn status_cmd() -> Command {
    Command::new("status")
        .about("report per-resource health for a release")
        .args(release_selector_args())
        .arg(Arg::new("watch").long("watch").action(ArgAction::SetTrue))
        .arg(Arg::new("interval-secs").long("interval-secs").default_value("5"))
}

/// Flags shared by `build`/`apply`/`diff`.
pub struct RenderArgs {
    pub path: PathBuf,
    pub name: String,
    pub namespace: String,
    pub provider: PathBuf,
    pub values: Vec<PathBuf>,
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
}

impl TryFrom<&clap::ArgMatches> for RenderArgs {
    type Error = anyhow::Error;

    fn try_from(m: &clap::ArgMatches) -> Result<Self, Self::Error> {
        Ok(Self {
            path: m.get_one::<String>("path").unwrap().into(),
            name: m.get_one::<String>("name").unwrap().clone(),
            namespace: m.get_one::<String>("namespace").unwrap().clone(),
            provider: m.get_one::<String>("provider").unwrap().into(),
            values: m.get_many::<String>("values").unwrap_or_default().map(PathBuf::from).collect(),
            kubeconfig: m.get_one::<String>("kubeconfig").map(PathBuf::from),
            context: m.get_one::<String>("context").cloned(),
        })
    }
}

/// Selector shared by `delete`/`status`: exactly one of name or id.
pub enum ReleaseSelector {
    Name(String),
    Id(uuid::Uuid),
}

pub struct SelectorArgs {
    pub selector: ReleaseSelector,
    pub namespace: String,
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
}

impl TryFrom<&clap::ArgMatches> for SelectorArgs {
    type Error = anyhow::Error;

    fn try_from(m: &clap::ArgMatches) -> Result<Self, Self::Error> {
        let selector = match (m.get_one::<String>("release-name"), m.get_one::<String>("release-id")) {
            (Some(name), None) => ReleaseSelector::Name(name.clone()),
            (None, Some(id)) => ReleaseSelector::Id(uuid::Uuid::parse_str(id)?),
            _ => anyhow::bail!("exactly one of --release-name or --release-id is required"),
        };
        Ok(Self {
            selector,
            namespace: m.get_one::<String>("namespace").unwrap().clone(),
            kubeconfig: m.get_one::<String>("kubeconfig").map(PathBuf::from),
            context: m.get_one::<String>("context").cloned(),
        })
    }
}
