use serde_yaml::{Mapping, Value};

use crate::error::PlaybookError;
use crate::models::{HostTarget, ModuleArgs, Play, Playbook, Step};

const TITLE_KEY: &str = "name";

/// Render a playbook as a YAML list of plays.
///
/// Play keys come out as `name`, `hosts`, `tasks`; each task is
/// `name` followed by a single `<module>: <args>` entry. Steps running a
/// module literally called `name` are written without a title.
pub fn to_yaml(playbook: &Playbook) -> Result<String, serde_yaml::Error> {
    let plays = playbook
        .plays
        .iter()
        .map(play_value)
        .collect::<Result<Vec<_>, _>>()?;
    serde_yaml::to_string(&plays)
}

fn play_value(play: &Play) -> Result<Value, serde_yaml::Error> {
    let mut node = Mapping::new();
    node.insert("name".into(), play.name.as_str().into());
    node.insert("hosts".into(), serde_yaml::to_value(&play.hosts)?);

    let tasks = play
        .tasks
        .iter()
        .map(|step| {
            let mut task = Mapping::new();
            // A module called `name` owns the key; its title is the default one.
            if step.module != TITLE_KEY {
                task.insert(TITLE_KEY.into(), step.name.as_str().into());
            }
            task.insert(step.module.as_str().into(), serde_yaml::to_value(&step.args)?);
            Ok(Value::Mapping(task))
        })
        .collect::<Result<Vec<_>, serde_yaml::Error>>()?;
    node.insert("tasks".into(), Value::Sequence(tasks));

    Ok(Value::Mapping(node))
}

/// Read plays back from YAML produced by [`to_yaml`] (or written by hand in
/// the same shape).
pub fn from_yaml(text: &str) -> Result<Vec<Play>, PlaybookError> {
    let plays: Vec<Mapping> =
        serde_yaml::from_str(text).map_err(|e| PlaybookError::Yaml(e.to_string()))?;
    plays.into_iter().enumerate().map(read_play).collect()
}

fn read_play((index, mut node): (usize, Mapping)) -> Result<Play, PlaybookError> {
    let name = match node.remove("name") {
        Some(Value::String(s)) => s,
        Some(_) => return Err(malformed(format!("play {} name must be a string", index))),
        None => String::new(),
    };
    let hosts = node
        .remove("hosts")
        .ok_or_else(|| malformed(format!("play {} has no hosts", index)))?;
    let hosts: HostTarget = serde_yaml::from_value(hosts)
        .map_err(|_| malformed(format!("play {} hosts must be a name or list of names", index)))?;

    let tasks = match node.remove("tasks") {
        Some(Value::Sequence(items)) => items,
        Some(Value::Null) | None => Vec::new(),
        Some(_) => return Err(malformed(format!("play {} tasks must be a list", index))),
    };
    let tasks = tasks
        .into_iter()
        .map(|task| read_step(index, task))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Play { name, hosts, tasks })
}

fn read_step(play: usize, task: Value) -> Result<Step, PlaybookError> {
    let Value::Mapping(mut task) = task else {
        return Err(malformed(format!("play {} has a task that is not a mapping", play)));
    };
    let (name, entry) = match task.remove(TITLE_KEY) {
        Some(Value::String(s)) => (Some(s), None),
        // No title string: the key is the `name` module with its arguments.
        Some(args @ (Value::Mapping(_) | Value::Null)) if task.is_empty() => {
            (None, Some((Value::from(TITLE_KEY), args)))
        }
        Some(_) => {
            return Err(malformed(format!("play {} has a task whose name is not a string", play)))
        }
        None => (None, None),
    };

    let (module, args) = match entry {
        Some(entry) => entry,
        None => {
            if task.len() != 1 {
                return Err(malformed(format!(
                    "play {} task {:?} must name exactly one module, found {}",
                    play,
                    name.as_deref().unwrap_or(""),
                    task.len()
                )));
            }
            let Some(entry) = task.into_iter().next() else {
                return Err(malformed(format!("play {} has an empty task", play)));
            };
            entry
        }
    };
    let Value::String(module) = module else {
        return Err(malformed(format!("play {} module names must be strings", play)));
    };
    let args: ModuleArgs = match args {
        Value::Null => ModuleArgs::new(),
        other => serde_yaml::from_value(other)
            .map_err(|e| malformed(format!("arguments for '{}': {}", module, e)))?,
    };

    let mut step = Step::new(module, args);
    if let Some(name) = name {
        step.name = name;
    }
    Ok(step)
}

fn malformed(reason: String) -> PlaybookError {
    PlaybookError::Malformed(reason)
}
