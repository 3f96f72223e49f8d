//! The pass manager: owns the configured factory and the pass tree, and
//! drives compilation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::Value;
use tracing::info;

use alsvid_ir::Program;
use alsvid_plat::Platform;

use crate::context::CancellationToken;
use crate::error::{PassError, PassResult};
use crate::factory::Factory;
use crate::options::OptionValue;
use crate::pass::PassNode;

/// Legacy global options translated into pass options when a strategy
/// enables compatibility mode. Carried explicitly; there is no process
/// state.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Legacy scheduler selection: `"asap"` or `"alap"`.
    pub scheduler: Option<String>,
    /// Legacy uniform-scheduler toggle; wins over `scheduler`.
    pub scheduler_uniform: Option<bool>,
    /// Legacy multi-qubit commutation toggle.
    pub scheduler_commute: Option<bool>,
    /// Legacy single-qubit rotation commutation toggle.
    pub scheduler_commute_rotations: Option<bool>,
    /// Legacy one-to-one initial mapping toggle.
    pub map_init_one_to_one: Option<bool>,
    /// Legacy assume-initialized mapping toggle.
    pub map_assume_zero_init_state: Option<bool>,
}

/// Translate the legacy global options into pass-option defaults. Each
/// entry is attempted for every pass and silently skipped where the pass
/// does not declare the option.
fn compat_pass_options(globals: &GlobalOptions) -> BTreeMap<String, Option<OptionValue>> {
    let mut out = BTreeMap::new();
    if globals.scheduler.is_some() || globals.scheduler_uniform.is_some() {
        let target = if globals.scheduler_uniform == Some(true) {
            "uniform"
        } else if globals.scheduler.as_deref() == Some("asap") {
            "asap"
        } else {
            "alap"
        };
        out.insert(
            "scheduler_target".to_string(),
            Some(OptionValue::Str(target.into())),
        );
    }
    if let Some(commute) = globals.scheduler_commute {
        out.insert(
            "commute_multi_qubit".to_string(),
            Some(OptionValue::Bool(commute)),
        );
    }
    if let Some(commute) = globals.scheduler_commute_rotations {
        out.insert(
            "commute_single_qubit".to_string(),
            Some(OptionValue::Bool(commute)),
        );
    }
    if let Some(one_to_one) = globals.map_init_one_to_one {
        out.insert(
            "initialize_one_to_one".to_string(),
            Some(OptionValue::Bool(one_to_one)),
        );
    }
    if let Some(initialized) = globals.map_assume_zero_init_state {
        out.insert(
            "assume_initialized".to_string(),
            Some(OptionValue::Bool(initialized)),
        );
    }
    out
}

/// The top-level pass manager.
///
/// Holds a tree of passes representing a compilation strategy. Passes are
/// addressed by dotted instance paths, options by `<path>.<option>`.
/// `compile` constructs the tree (freezing options) and executes it in
/// pre-order over the shared program.
pub struct Manager {
    factory: Factory,
    root: PassNode,
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("factory", &self.factory)
            .field("root", &self.root)
            .finish()
    }
}

impl Manager {
    /// Create a manager with an empty strategy. The factory is configured
    /// for the given architecture and do-not-use opt-in list.
    pub fn new(architecture: &str, dnu: &BTreeSet<String>, factory: &Factory) -> Self {
        let factory = factory.configure(architecture, dnu);
        let root = factory
            .build_pass("", "")
            .expect("the generic root group always builds");
        Self { factory, root }
    }

    /// Construct a manager from a strategy description:
    ///
    /// ```json
    /// {
    ///     "architecture": <optional string, default "">,
    ///     "dnu": <optional string or list of strings, default []>,
    ///     "pass-options": <optional object, default {}>,
    ///     "compatibility-mode": <optional boolean, default false>,
    ///     "passes": [ <pass description> ]
    /// }
    /// ```
    ///
    /// A pass description is either a type-name string or an object with
    /// `type`, `name`, `options`, `group-options` and `group` keys. Option
    /// values may be booleans, integers, strings or null (null restores
    /// the hardcoded default). With `compatibility-mode`, well-known
    /// legacy globals from `globals` are added as pass options, with
    /// explicit `pass-options` entries taking precedence.
    pub fn from_json(
        strategy: &Value,
        factory: &Factory,
        globals: &GlobalOptions,
    ) -> PassResult<Manager> {
        let obj = strategy.as_object().ok_or_else(|| PassError::JsonShape {
            path: "strategy".into(),
            reason: "expected an object".into(),
        })?;

        let mut architecture = String::new();
        let mut dnu: BTreeSet<String> = BTreeSet::new();
        let mut pass_options: Option<&serde_json::Map<String, Value>> = None;
        let mut compatibility_mode = false;
        let mut passes: Option<&Vec<Value>> = None;

        for (key, value) in obj {
            match key.as_str() {
                "architecture" => {
                    architecture = value
                        .as_str()
                        .ok_or_else(|| shape("strategy.architecture", "expected a string"))?
                        .to_string();
                }
                "dnu" => match value {
                    Value::String(s) => {
                        dnu.insert(s.clone());
                    }
                    Value::Array(items) => {
                        for (i, item) in items.iter().enumerate() {
                            let s = item.as_str().ok_or_else(|| {
                                shape(&format!("strategy.dnu[{i}]"), "expected a string")
                            })?;
                            dnu.insert(s.to_string());
                        }
                    }
                    _ => {
                        return Err(shape(
                            "strategy.dnu",
                            "expected a string or an array of strings",
                        ));
                    }
                },
                "pass-options" => {
                    pass_options = Some(value.as_object().ok_or_else(|| {
                        shape("strategy.pass-options", "expected an object")
                    })?);
                }
                "compatibility-mode" => {
                    compatibility_mode = value.as_bool().ok_or_else(|| {
                        shape("strategy.compatibility-mode", "expected a boolean")
                    })?;
                }
                "passes" => {
                    passes = Some(value.as_array().ok_or_else(|| {
                        shape("strategy.passes", "expected an array of pass descriptions")
                    })?);
                }
                other => {
                    return Err(shape(
                        &format!("strategy.{other}"),
                        "unknown key in strategy",
                    ));
                }
            }
        }
        let passes = passes.ok_or_else(|| shape("strategy.passes", "missing required key"))?;

        let mut manager = Manager::new(&architecture, &dnu, factory);

        // Root-level propagated options: compatibility-mode entries first,
        // explicit pass-options over them.
        if compatibility_mode {
            for (name, value) in compat_pass_options(globals) {
                manager.root.set_group_option(name, value);
            }
        }
        if let Some(options) = pass_options {
            for (name, value) in options {
                let value = OptionValue::from_json(name, value)?;
                manager.root.set_group_option(name.clone(), value);
            }
        }

        let factory = manager.factory.clone();
        add_passes_from_json(&mut manager.root, &factory, passes, "strategy.passes")?;
        Ok(manager)
    }

    /// The root pass group.
    pub fn root(&self) -> &PassNode {
        &self.root
    }

    /// The root pass group, mutable.
    pub fn root_mut(&mut self) -> &mut PassNode {
        &mut self.root
    }

    /// The configured factory.
    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    /// Append a pass to the end of the root pass list. An empty type name
    /// adds a generic subgroup; an empty instance name generates one.
    pub fn append_pass(
        &mut self,
        type_name: &str,
        instance_name: &str,
    ) -> PassResult<&mut PassNode> {
        self.root
            .append_sub_pass(&self.factory, type_name, instance_name)
    }

    /// Append a pass to the front of the root pass list.
    pub fn prefix_pass(
        &mut self,
        type_name: &str,
        instance_name: &str,
    ) -> PassResult<&mut PassNode> {
        self.root
            .prefix_sub_pass(&self.factory, type_name, instance_name)
    }

    /// Insert a pass immediately before the pass at `target`.
    pub fn insert_pass_before(
        &mut self,
        target: &str,
        type_name: &str,
        instance_name: &str,
    ) -> PassResult<&mut PassNode> {
        self.root
            .insert_sub_pass_before(&self.factory, target, type_name, instance_name)
    }

    /// Insert a pass immediately after the pass at `target`.
    pub fn insert_pass_after(
        &mut self,
        target: &str,
        type_name: &str,
        instance_name: &str,
    ) -> PassResult<&mut PassNode> {
        self.root
            .insert_sub_pass_after(&self.factory, target, type_name, instance_name)
    }

    /// Remove the pass at `target`.
    pub fn remove_pass(&mut self, target: &str) -> PassResult<()> {
        self.root.remove_sub_pass(target).map(|_| ())
    }

    /// Embed the pass at `target` into a new group that assumes its name;
    /// the original pass is renamed to `sub_name`.
    pub fn group_pass(&mut self, target: &str, sub_name: &str) -> PassResult<&mut PassNode> {
        self.root.group_sub_pass(target, sub_name)
    }

    /// Group the inclusive sibling range `from..=to` into a new group
    /// named `group_name`, keeping the original pass names.
    pub fn group_passes(
        &mut self,
        from: &str,
        to: &str,
        group_name: &str,
    ) -> PassResult<&mut PassNode> {
        self.root.group_sub_passes(from, to, group_name)
    }

    /// Flatten the generic group at `target` into its parent, prefixing
    /// the contained pass names with `name_prefix`.
    pub fn flatten_subgroup(&mut self, target: &str, name_prefix: &str) -> PassResult<()> {
        self.root.flatten_subgroup(target, name_prefix)
    }

    /// All passes of the given type, in pre-order.
    pub fn passes_by_type(&self, type_name: &str) -> Vec<&PassNode> {
        self.root.sub_passes_by_type(type_name)
    }

    /// The pass at `target`.
    pub fn get_pass(&self, target: &str) -> PassResult<&PassNode> {
        self.root.get_sub_pass(target)
    }

    /// Whether a pass exists at `target`.
    pub fn pass_exists(&self, target: &str) -> bool {
        self.root.sub_pass_exists(target)
    }

    /// Total number of passes in the strategy.
    pub fn num_passes(&self) -> usize {
        self.root.num_sub_passes()
    }

    /// Set an option by dotted path, with `?`/`*` wildcards in pass
    /// components and `**.<option>` for subtree-wide application. Returns
    /// the number of passes affected; with `must_exist`, zero is an error.
    pub fn set_option(
        &mut self,
        path: &str,
        value: OptionValue,
        must_exist: bool,
    ) -> PassResult<usize> {
        self.root.set_option(path, &value, must_exist)
    }

    /// Resolve an option value by dotted path (no wildcards).
    pub fn get_option(&self, path: &str) -> PassResult<&OptionValue> {
        self.root.get_option(path)
    }

    /// Construct all passes recursively, freezing their options and
    /// propagating group-option defaults. Idempotent.
    pub fn construct(&mut self) -> PassResult<()> {
        self.root
            .construct_recursive(&self.factory, &BTreeMap::new())
    }

    /// Construct the strategy, then execute it in pre-order on the
    /// program. Failures carry the dotted path of the failing pass and the
    /// root cause.
    pub fn compile(
        &mut self,
        program: &mut Program,
        platform: &Platform,
        cancel: &CancellationToken,
    ) -> PassResult<()> {
        self.construct()?;
        info!(
            program = %program.name,
            passes = self.num_passes(),
            "compiling program"
        );
        self.root.compile(program, platform, cancel, "")
    }

    /// Dump the configured strategy.
    pub fn dump_strategy(&self, w: &mut impl fmt::Write) -> fmt::Result {
        self.root.dump_strategy(w, "")
    }

    /// Dump documentation for every pass type the factory knows.
    pub fn dump_pass_types(&self, w: &mut impl fmt::Write) -> fmt::Result {
        self.factory.dump_pass_types(w)
    }
}

fn shape(path: &str, reason: &str) -> PassError {
    PassError::JsonShape {
        path: path.into(),
        reason: reason.into(),
    }
}

/// Load pass descriptions into a group.
fn add_passes_from_json(
    group: &mut PassNode,
    factory: &Factory,
    passes: &[Value],
    json_path: &str,
) -> PassResult<()> {
    for (i, description) in passes.iter().enumerate() {
        let path = format!("{json_path}[{i}]");
        let mut type_name = String::new();
        let mut instance_name = String::new();
        let mut options: Option<&serde_json::Map<String, Value>> = None;
        let mut group_options: Option<&serde_json::Map<String, Value>> = None;
        let mut sub_passes: Option<&Vec<Value>> = None;

        match description {
            Value::String(s) => type_name = s.clone(),
            Value::Object(obj) => {
                for (key, value) in obj {
                    match key.as_str() {
                        "type" => {
                            type_name = value
                                .as_str()
                                .ok_or_else(|| shape(&format!("{path}.type"), "expected a string"))?
                                .to_string();
                        }
                        "name" => {
                            instance_name = value
                                .as_str()
                                .ok_or_else(|| shape(&format!("{path}.name"), "expected a string"))?
                                .to_string();
                        }
                        "options" => {
                            options = Some(value.as_object().ok_or_else(|| {
                                shape(&format!("{path}.options"), "expected an object")
                            })?);
                        }
                        "group-options" => {
                            group_options = Some(value.as_object().ok_or_else(|| {
                                shape(&format!("{path}.group-options"), "expected an object")
                            })?);
                        }
                        "group" => {
                            sub_passes = Some(value.as_array().ok_or_else(|| {
                                shape(
                                    &format!("{path}.group"),
                                    "expected an array of pass descriptions",
                                )
                            })?);
                        }
                        other => {
                            return Err(shape(
                                &format!("{path}.{other}"),
                                "unknown key in pass description",
                            ));
                        }
                    }
                }
            }
            _ => {
                return Err(shape(&path, "pass description must be a string or an object"));
            }
        }
        if type_name.is_empty() && sub_passes.is_none() {
            return Err(shape(&path, "either pass type or pass group must be specified"));
        }

        let pass = group.append_sub_pass(factory, &type_name, &instance_name)?;

        if let Some(options) = options {
            for (name, value) in options {
                pass.options_mut().set_from_json(name, value)?;
            }
        }
        if let Some(group_options) = group_options {
            for (name, value) in group_options {
                let value = OptionValue::from_json(name, value)?;
                pass.set_group_option(name.clone(), value);
            }
        }

        if let Some(sub_passes) = sub_passes {
            pass.construct(factory)?;
            if !pass.is_group() {
                return Err(PassError::PassNotGroup {
                    path: pass.name().to_string(),
                });
            }
            add_passes_from_json(pass, factory, sub_passes, &format!("{path}.group"))?;
        }
    }
    Ok(())
}
