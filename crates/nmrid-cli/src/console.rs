//! Line-oriented console over an in-memory store and its project.

use std::rc::Rc;

use anyhow::{anyhow, bail};
use nmrid_core::descriptor;
use nmrid_core::{ClassKind, Handle, Pid, Project, Wrapper};
use nmrid_store::{DataStore, InMemoryStore};
use serde::Serialize;
use tracing::debug;

use crate::cli::OutputFormat;
use crate::config::CliConfig;

const HELP: &str = "\
new <class> <parent-pid|-> <key...>   create a store object
rename <pid> <key...>                 change an object's key
delete <pid>                          delete an object and its contents
get <pid>                             show one wrapper
children <pid> <plural>               follow a plural link, e.g. residues
tree                                  print every wrapper
verify                                check wrappers against the store
help                                  this text";

#[derive(Serialize)]
struct WrapperInfo {
    pid: Pid,
    long_pid: String,
    handle: Handle,
    parent: Option<Pid>,
    children: usize,
}

#[derive(Serialize)]
struct TreeLine {
    depth: usize,
    pid: Pid,
}

pub struct Console {
    store: Rc<InMemoryStore>,
    project: Project,
    format: OutputFormat,
}

impl Console {
    /// A fresh store named after the config, with a project attached.
    pub fn new(config: &CliConfig, format: OutputFormat) -> anyhow::Result<Self> {
        Pid::new(ClassKind::Project, [config.store_name.as_str()])?;
        let store = Rc::new(InMemoryStore::new(&config.store_name));
        let dyn_store: Rc<dyn DataStore> = store.clone();
        let project = Project::attach_with_config(dyn_store, config.project.clone())?;
        Ok(Self {
            store,
            project,
            format,
        })
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Run one console line. Blank lines and `#` comments produce no output.
    pub fn execute(&self, line: &str) -> anyhow::Result<Option<String>> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            return Ok(None);
        };
        if command.starts_with('#') {
            return Ok(None);
        }
        debug!(command, ?args, "console command");
        let output = match command {
            "new" => self.cmd_new(args)?,
            "rename" => self.cmd_rename(args)?,
            "delete" => self.cmd_delete(args)?,
            "get" => self.cmd_get(args)?,
            "children" => self.cmd_children(args)?,
            "tree" => self.cmd_tree()?,
            "verify" => self.cmd_verify()?,
            "help" => HELP.to_string(),
            other => bail!("unknown command {other:?} (try `help`)"),
        };
        Ok(Some(output))
    }

    fn resolve(&self, text: &str) -> anyhow::Result<Wrapper> {
        self.project
            .get_by_pid(text)?
            .ok_or_else(|| anyhow!("no object with pid {text}"))
    }

    fn render<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> anyhow::Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Text => Ok(text()),
        }
    }

    fn cmd_new(&self, args: &[&str]) -> anyhow::Result<String> {
        let [class, parent, key @ ..] = args else {
            bail!("usage: new <class> <parent-pid|-> <key...>");
        };
        let kind = ClassKind::from_tag(class, true).ok_or_else(|| anyhow!("unknown class {class:?}"))?;
        if kind == ClassKind::Project {
            bail!("the project record already exists");
        }
        if key.len() != kind.key_arity() {
            bail!("{kind} takes {} key part(s), got {}", kind.key_arity(), key.len());
        }
        let parent_handle = if *parent == "-" {
            self.store.root()
        } else {
            let parent = self.resolve(parent)?;
            if Some(parent.kind()) != kind.parent() {
                bail!("{kind} cannot be created under {}", parent.kind());
            }
            parent.handle()
        };

        let store_class = descriptor::descriptor(kind).store_class;
        let handle = self.store.create(parent_handle, store_class, key.iter().copied())?;
        let wrapper = self
            .project
            .get_by_handle(handle)
            .ok_or_else(|| anyhow!("{handle} was created but not wrapped"))?;
        Ok(format!("created {}", wrapper.pid()?))
    }

    fn cmd_rename(&self, args: &[&str]) -> anyhow::Result<String> {
        let [pid, key @ ..] = args else {
            bail!("usage: rename <pid> <key...>");
        };
        let wrapper = self.resolve(pid)?;
        if key.len() != wrapper.kind().key_arity() {
            bail!("{} takes {} key part(s), got {}", wrapper.kind(), wrapper.kind().key_arity(), key.len());
        }
        self.store.rename(wrapper.handle(), key.iter().copied())?;
        Ok(format!("renamed {pid} to {}", wrapper.pid()?))
    }

    fn cmd_delete(&self, args: &[&str]) -> anyhow::Result<String> {
        let [pid] = args else {
            bail!("usage: delete <pid>");
        };
        let wrapper = self.resolve(pid)?;
        let before = self.project.len();
        self.store.delete(wrapper.handle())?;
        Ok(format!("deleted {pid} ({} wrapper(s) evicted)", before - self.project.len()))
    }

    fn cmd_get(&self, args: &[&str]) -> anyhow::Result<String> {
        let [pid] = args else {
            bail!("usage: get <pid>");
        };
        let wrapper = self.resolve(pid)?;
        let info = WrapperInfo {
            pid: wrapper.pid()?,
            long_pid: wrapper.long_pid()?,
            handle: wrapper.handle(),
            parent: wrapper.parent()?.map(|p| p.pid()).transpose()?,
            children: wrapper.direct_children()?.len(),
        };
        self.render(&info, || {
            let parent = info.parent.as_ref().map_or("-".to_string(), Pid::render);
            format!(
                "{} ({}) {} parent={} children={}",
                info.pid, info.long_pid, info.handle, parent, info.children
            )
        })
    }

    fn cmd_children(&self, args: &[&str]) -> anyhow::Result<String> {
        let [pid, link] = args else {
            bail!("usage: children <pid> <plural>");
        };
        let pids = self
            .resolve(pid)?
            .plural(link)?
            .iter()
            .map(Wrapper::pid)
            .collect::<Result<Vec<_>, _>>()?;
        self.render(&pids, || {
            pids.iter().map(Pid::render).collect::<Vec<_>>().join("\n")
        })
    }

    fn cmd_tree(&self) -> anyhow::Result<String> {
        let mut lines = Vec::new();
        let mut stack = vec![(self.project.as_wrapper()?, 0)];
        while let Some((wrapper, depth)) = stack.pop() {
            lines.push(TreeLine {
                depth,
                pid: wrapper.pid()?,
            });
            for child in wrapper.direct_children()?.into_iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        self.render(&lines, || {
            lines
                .iter()
                .map(|line| format!("{}{}", "  ".repeat(line.depth), line.pid))
                .collect::<Vec<_>>()
                .join("\n")
        })
    }

    fn cmd_verify(&self) -> anyhow::Result<String> {
        let report = self.project.verify()?;
        self.render(&report, || {
            if report.is_valid() {
                format!(
                    "ok: {} wrapper(s), {} store object(s)",
                    report.wrapper_count, report.store_count
                )
            } else {
                report
                    .violations
                    .iter()
                    .map(|v| match v.handle {
                        Some(handle) => format!("{:?} {handle}: {}", v.kind, v.description),
                        None => format!("{:?}: {}", v.kind, v.description),
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        })
    }
}
