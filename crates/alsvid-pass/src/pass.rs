//! The pass tree: nodes, construction, option addressing and execution.
//!
//! A pass is either a *leaf* (runs a transformation or analysis on the
//! program) or a *group* (runs its sub-passes in order). The root of a
//! compilation strategy is a group with an empty instance name. Nodes own
//! their children; the factory is passed by reference during construction
//! only and never stored.
//!
//! Construction (`construct`) is idempotent: it lets the implementation
//! decide leaf-versus-group (a leaf may expand into a group based on its
//! options), freezes the option set, and propagates group-option defaults
//! downward. Group membership may still be edited afterwards.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use alsvid_ir::Program;
use alsvid_plat::Platform;

use crate::context::{CancellationToken, PassContext};
use crate::error::{PassError, PassResult};
use crate::factory::Factory;
use crate::options::{OptionValue, Options};

/// Whether a pass constructed into a leaf or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupFlag {
    /// The pass runs itself via `on_compile`.
    Leaf,
    /// The pass runs its sub-passes in order instead.
    Group,
}

/// The behavior of a pass type, registered with the [`Factory`].
pub trait PassImpl {
    /// The full, desugared type name this pass was registered under.
    fn type_name(&self) -> &str;

    /// Write the documentation for this pass type.
    fn dump_docs(&self, w: &mut dyn fmt::Write, prefix: &str) -> fmt::Result;

    /// Declare the options this pass understands.
    fn declare_options(&self, options: &mut Options);

    /// Decide whether this pass is a leaf or expands into a group; a group
    /// may seed `children` with its initial sub-passes.
    fn on_construct(
        &mut self,
        factory: &Factory,
        options: &Options,
        children: &mut Vec<PassNode>,
    ) -> PassResult<GroupFlag>;

    /// Run the pass on the program. Only called for leaves.
    fn on_compile(&self, program: &mut Program, ctx: &PassContext<'_>) -> PassResult<()>;
}

/// A generic group of passes with no behavior of its own; also the root of
/// every pass tree.
pub(crate) struct GenericGroup;

impl PassImpl for GenericGroup {
    fn type_name(&self) -> &str {
        ""
    }

    fn dump_docs(&self, w: &mut dyn fmt::Write, prefix: &str) -> fmt::Result {
        writeln!(
            w,
            "{prefix}A basic pass group: runs its sub-passes in order, with no \
             behavior of its own."
        )
    }

    fn declare_options(&self, _options: &mut Options) {}

    fn on_construct(
        &mut self,
        _factory: &Factory,
        _options: &Options,
        _children: &mut Vec<PassNode>,
    ) -> PassResult<GroupFlag> {
        Ok(GroupFlag::Group)
    }

    fn on_compile(&self, _program: &mut Program, _ctx: &PassContext<'_>) -> PassResult<()> {
        debug_assert!(false, "groups do not compile themselves");
        Ok(())
    }
}

/// A node of the pass tree.
pub struct PassNode {
    type_name: String,
    instance_name: String,
    options: Options,
    constructed: bool,
    group: bool,
    /// Option defaults for the sub-passes of this group; `None` resets the
    /// option to its hardcoded default.
    group_options: BTreeMap<String, Option<OptionValue>>,
    children: Vec<PassNode>,
    imp: Box<dyn PassImpl>,
}

impl fmt::Debug for PassNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassNode")
            .field("type_name", &self.type_name)
            .field("instance_name", &self.instance_name)
            .field("options", &self.options)
            .field("constructed", &self.constructed)
            .field("group", &self.group)
            .field("group_options", &self.group_options)
            .field("children", &self.children)
            .finish()
    }
}

/// Check an instance name against `[A-Za-z0-9_\-]+`.
fn check_name(name: &str) -> PassResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(PassError::InvalidInstanceName { name: name.into() })
    }
}

/// Glob matching with `*` (any characters) and `?` (one character).
fn glob_match(pattern: &str, name: &str) -> bool {
    fn rec(p: &[u8], n: &[u8]) -> bool {
        match p.split_first() {
            None => n.is_empty(),
            Some((b'*', pr)) => rec(pr, n) || (!n.is_empty() && rec(p, &n[1..])),
            Some((b'?', pr)) => !n.is_empty() && rec(pr, &n[1..]),
            Some((c, pr)) => n.first() == Some(c) && rec(pr, &n[1..]),
        }
    }
    rec(pattern.as_bytes(), name.as_bytes())
}

impl PassNode {
    /// Create a node around an implementation. `group` marks nodes that
    /// are groups from the start (generic groups); typed passes become
    /// groups only if their construction says so.
    pub(crate) fn new(imp: Box<dyn PassImpl>, instance_name: String, group: bool) -> Self {
        let mut options = Options::new();
        imp.declare_options(&mut options);
        Self {
            type_name: imp.type_name().to_string(),
            instance_name,
            options,
            constructed: false,
            group,
            group_options: BTreeMap::new(),
            children: vec![],
            imp,
        }
    }

    /// The full, desugared type name ("" for generic groups).
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The instance name ("" only for the root group).
    pub fn name(&self) -> &str {
        &self.instance_name
    }

    /// Whether this pass is (or constructed into) a group.
    pub fn is_group(&self) -> bool {
        self.group
    }

    /// Whether `construct` has run.
    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    /// The option set.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The option set, mutable. Setting options still fails once the pass
    /// is constructed.
    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// The sub-passes, in execution order.
    pub fn sub_passes(&self) -> &[PassNode] {
        &self.children
    }

    /// Total number of passes in this subtree, excluding this node.
    pub fn num_sub_passes(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.num_sub_passes())
            .sum()
    }

    /// Record a group-option default for the sub-passes of this group.
    /// `None` resets the option to its hardcoded default.
    pub fn set_group_option(&mut self, name: impl Into<String>, value: Option<OptionValue>) {
        self.group_options.insert(name.into(), value);
    }

    /// Write the documentation for this pass type and its options.
    pub fn dump_docs(&self, w: &mut impl fmt::Write, prefix: &str) -> fmt::Result {
        self.imp.dump_docs(w, prefix)?;
        self.options.dump_help(w, prefix)
    }

    fn generate_name(&self, type_name: &str) -> String {
        let base = type_name
            .rsplit('.')
            .next()
            .filter(|s| !s.is_empty())
            .map_or_else(|| "group".to_string(), str::to_ascii_lowercase);
        if !self.children.iter().any(|c| c.instance_name == base) {
            return base;
        }
        let mut i = 1;
        loop {
            let candidate = format!("{base}_{i}");
            if !self.children.iter().any(|c| c.instance_name == candidate) {
                return candidate;
            }
            i += 1;
        }
    }

    fn insert_sub_pass(
        &mut self,
        factory: &Factory,
        index: usize,
        type_name: &str,
        instance_name: &str,
    ) -> PassResult<&mut PassNode> {
        if !self.group {
            return Err(PassError::PassNotGroup {
                path: self.instance_name.clone(),
            });
        }
        let name = if instance_name.is_empty() {
            self.generate_name(type_name)
        } else {
            check_name(instance_name)?;
            instance_name.to_string()
        };
        if self.children.iter().any(|c| c.instance_name == name) {
            return Err(PassError::DuplicateInstanceName { name });
        }
        let node = factory.build_pass(type_name, &name)?;
        self.children.insert(index, node);
        Ok(&mut self.children[index])
    }

    /// Append a sub-pass at the end of this group's pass list. An empty
    /// type name adds a generic subgroup; an empty instance name generates
    /// one.
    pub fn append_sub_pass(
        &mut self,
        factory: &Factory,
        type_name: &str,
        instance_name: &str,
    ) -> PassResult<&mut PassNode> {
        self.insert_sub_pass(factory, self.children.len(), type_name, instance_name)
    }

    /// Insert a sub-pass at the front of this group's pass list.
    pub fn prefix_sub_pass(
        &mut self,
        factory: &Factory,
        type_name: &str,
        instance_name: &str,
    ) -> PassResult<&mut PassNode> {
        self.insert_sub_pass(factory, 0, type_name, instance_name)
    }

    /// Insert a sub-pass immediately before the pass at `target` (a dotted
    /// instance path).
    pub fn insert_sub_pass_before(
        &mut self,
        factory: &Factory,
        target: &str,
        type_name: &str,
        instance_name: &str,
    ) -> PassResult<&mut PassNode> {
        let (parent, index) = self.locate_mut(target)?;
        parent.insert_sub_pass(factory, index, type_name, instance_name)
    }

    /// Insert a sub-pass immediately after the pass at `target`.
    pub fn insert_sub_pass_after(
        &mut self,
        factory: &Factory,
        target: &str,
        type_name: &str,
        instance_name: &str,
    ) -> PassResult<&mut PassNode> {
        let (parent, index) = self.locate_mut(target)?;
        parent.insert_sub_pass(factory, index + 1, type_name, instance_name)
    }

    /// Remove and return the pass at `target`.
    pub fn remove_sub_pass(&mut self, target: &str) -> PassResult<PassNode> {
        let (parent, index) = self.locate_mut(target)?;
        Ok(parent.children.remove(index))
    }

    /// Resolve a dotted instance path to a pass in this subtree.
    pub fn get_sub_pass(&self, path: &str) -> PassResult<&PassNode> {
        let mut node = self;
        for comp in path.split('.') {
            node = node
                .children
                .iter()
                .find(|c| c.instance_name == comp)
                .ok_or_else(|| PassError::PathNotFound { path: path.into() })?;
        }
        Ok(node)
    }

    /// Mutable variant of [`PassNode::get_sub_pass`].
    pub fn get_sub_pass_mut(&mut self, path: &str) -> PassResult<&mut PassNode> {
        let mut node = self;
        for comp in path.split('.') {
            node = node
                .children
                .iter_mut()
                .find(|c| c.instance_name == comp)
                .ok_or_else(|| PassError::PathNotFound { path: path.into() })?;
        }
        Ok(node)
    }

    /// Whether a pass exists at the given dotted instance path.
    pub fn sub_pass_exists(&self, path: &str) -> bool {
        self.get_sub_pass(path).is_ok()
    }

    /// Resolve a path to `(parent group, index of last component)`.
    fn locate_mut(&mut self, path: &str) -> PassResult<(&mut PassNode, usize)> {
        let (prefix, last) = match path.rsplit_once('.') {
            Some((prefix, last)) => (Some(prefix), last),
            None => (None, path),
        };
        let parent = match prefix {
            Some(p) => self.get_sub_pass_mut(p)?,
            None => self,
        };
        if !parent.group {
            return Err(PassError::PassNotGroup {
                path: path.into(),
            });
        }
        let index = parent
            .children
            .iter()
            .position(|c| c.instance_name == last)
            .ok_or_else(|| PassError::PathNotFound { path: path.into() })?;
        Ok((parent, index))
    }

    /// Embed the pass at `target` into a newly created generic group. The
    /// group assumes the original pass's name; the original is renamed to
    /// `sub_name`. The overall pass order does not change.
    pub fn group_sub_pass(&mut self, target: &str, sub_name: &str) -> PassResult<&mut PassNode> {
        check_name(sub_name)?;
        let (parent, index) = self.locate_mut(target)?;
        let mut original = parent.children.remove(index);
        let group_name = std::mem::replace(&mut original.instance_name, sub_name.to_string());
        let mut group = PassNode::new(Box::new(GenericGroup), group_name, true);
        group.children.push(original);
        parent.children.insert(index, group);
        Ok(&mut parent.children[index])
    }

    /// Group the inclusive sibling range `from..=to` into a new generic
    /// group named `group_name`, keeping the original pass names. Both
    /// paths must address passes in the same group.
    pub fn group_sub_passes(
        &mut self,
        from: &str,
        to: &str,
        group_name: &str,
    ) -> PassResult<&mut PassNode> {
        check_name(group_name)?;
        let (from_prefix, from_last) = match from.rsplit_once('.') {
            Some((p, l)) => (Some(p), l),
            None => (None, from),
        };
        let (to_prefix, to_last) = match to.rsplit_once('.') {
            Some((p, l)) => (Some(p), l),
            None => (None, to),
        };
        if from_prefix != to_prefix {
            return Err(PassError::PathNotFound { path: to.into() });
        }
        let parent = match from_prefix {
            Some(p) => self.get_sub_pass_mut(p)?,
            None => self,
        };
        let start = parent
            .children
            .iter()
            .position(|c| c.instance_name == from_last)
            .ok_or_else(|| PassError::PathNotFound { path: from.into() })?;
        let end = parent
            .children
            .iter()
            .position(|c| c.instance_name == to_last)
            .ok_or_else(|| PassError::PathNotFound { path: to.into() })?;
        if end < start {
            return Err(PassError::PathNotFound { path: to.into() });
        }
        let clash = parent
            .children
            .iter()
            .enumerate()
            .any(|(i, c)| (i < start || i > end) && c.instance_name == group_name);
        if clash {
            return Err(PassError::DuplicateInstanceName {
                name: group_name.into(),
            });
        }
        let moved: Vec<PassNode> = parent.children.drain(start..=end).collect();
        let mut group = PassNode::new(Box::new(GenericGroup), group_name.to_string(), true);
        group.children = moved;
        parent.children.insert(start, group);
        Ok(&mut parent.children[start])
    }

    /// Flatten the generic group at `target` into its parent: its
    /// sub-passes take its place, their names prefixed with `name_prefix`.
    /// The overall pass order does not change.
    pub fn flatten_subgroup(&mut self, target: &str, name_prefix: &str) -> PassResult<()> {
        let (parent, index) = self.locate_mut(target)?;
        let candidate = &parent.children[index];
        if !candidate.group || !candidate.type_name.is_empty() {
            return Err(PassError::PassNotGroup {
                path: target.into(),
            });
        }

        // Validate the prefixed names against the surviving siblings
        // before touching anything.
        for child in &candidate.children {
            let new_name = format!("{name_prefix}{}", child.instance_name);
            check_name(&new_name)?;
            let clash = parent
                .children
                .iter()
                .enumerate()
                .any(|(i, c)| i != index && c.instance_name == new_name);
            if clash {
                return Err(PassError::DuplicateInstanceName { name: new_name });
            }
        }

        let group = parent.children.remove(index);
        for (offset, mut sub) in group.children.into_iter().enumerate() {
            sub.instance_name = format!("{name_prefix}{}", sub.instance_name);
            parent.children.insert(index + offset, sub);
        }
        Ok(())
    }

    /// All passes in this subtree with the given type name, in pre-order.
    pub fn sub_passes_by_type<'a>(&'a self, type_name: &str) -> Vec<&'a PassNode> {
        let mut out = vec![];
        for child in &self.children {
            if child.type_name == type_name {
                out.push(child);
            }
            out.extend(child.sub_passes_by_type(type_name));
        }
        out
    }

    /// Construct this pass: let the implementation decide leaf-or-group
    /// and freeze the options. Idempotent; no-op after the first call.
    pub fn construct(&mut self, factory: &Factory) -> PassResult<()> {
        if self.constructed {
            return Ok(());
        }
        let mut children = std::mem::take(&mut self.children);
        let flag = self
            .imp
            .on_construct(factory, &self.options, &mut children)?;
        self.children = children;
        self.group = self.group || flag == GroupFlag::Group;
        self.constructed = true;
        self.options.freeze();
        Ok(())
    }

    /// Construct this subtree recursively, propagating group-option
    /// defaults downward. An option from an enclosing group applies to a
    /// pass only when the pass declares it and has not set it locally;
    /// inner groups override outer ones.
    pub fn construct_recursive(
        &mut self,
        factory: &Factory,
        inherited: &BTreeMap<String, Option<OptionValue>>,
    ) -> PassResult<()> {
        if !self.constructed {
            for (name, value) in inherited {
                if self.options.has_option(name) && !self.options.is_set(name) {
                    match value {
                        Some(v) => self.options.set(name, v.clone())?,
                        None => self.options.reset(name)?,
                    }
                }
            }
        }
        self.construct(factory)?;
        if self.group {
            let mut merged = inherited.clone();
            for (k, v) in &self.group_options {
                merged.insert(k.clone(), v.clone());
            }
            for child in &mut self.children {
                child.construct_recursive(factory, &merged)?;
            }
        }
        Ok(())
    }

    /// Set an option along a dotted path. The last element is the option
    /// name; the preceding elements address passes and may carry `?`/`*`
    /// wildcards. A `**` element directly before the option name applies
    /// the option to every pass in the subtree. Returns the number of
    /// passes affected; a pass is affected only when the path selects it
    /// AND it declares the option. With `must_exist`, zero affected passes
    /// is an error.
    pub fn set_option(
        &mut self,
        path: &str,
        value: &OptionValue,
        must_exist: bool,
    ) -> PassResult<usize> {
        let components: Vec<&str> = path.split('.').collect();
        let (option, passes) = components
            .split_last()
            .ok_or_else(|| PassError::OptionPathNotFound { path: path.into() })?;
        let count = self.set_option_components(passes, option, value)?;
        if must_exist && count == 0 {
            return Err(PassError::OptionPathNotFound { path: path.into() });
        }
        Ok(count)
    }

    fn set_option_components(
        &mut self,
        passes: &[&str],
        option: &str,
        value: &OptionValue,
    ) -> PassResult<usize> {
        let Some((head, rest)) = passes.split_first() else {
            return self.set_local_option(option, value);
        };
        if *head == "**" && rest.is_empty() {
            return self.set_option_recursively(option, value);
        }
        let mut count = 0;
        for child in &mut self.children {
            if glob_match(head, &child.instance_name) {
                count += child.set_option_components(rest, option, value)?;
            }
        }
        Ok(count)
    }

    fn set_local_option(&mut self, option: &str, value: &OptionValue) -> PassResult<usize> {
        if self.options.has_option(option) {
            self.options.set(option, value.clone())?;
            Ok(1)
        } else {
            Ok(0)
        }
    }

    /// Set an option on this pass and every pass below it that declares
    /// it. Returns the number of passes affected.
    pub fn set_option_recursively(
        &mut self,
        option: &str,
        value: &OptionValue,
    ) -> PassResult<usize> {
        let mut count = self.set_local_option(option, value)?;
        for child in &mut self.children {
            count += child.set_option_recursively(option, value)?;
        }
        Ok(count)
    }

    /// Resolve an option value along a dotted path (no wildcards): the
    /// last element is the option name, the rest a pass path.
    pub fn get_option(&self, path: &str) -> PassResult<&OptionValue> {
        match path.rsplit_once('.') {
            None => self.options.get(path),
            Some((pass_path, option)) => self.get_sub_pass(pass_path)?.options.get(option),
        }
    }

    /// Execute this subtree in pre-order: leaves run their transformation,
    /// groups run their children in order. Errors are annotated with the
    /// failing pass's dotted path.
    pub fn compile(
        &self,
        program: &mut Program,
        platform: &Platform,
        cancel: &CancellationToken,
        parent_path: &str,
    ) -> PassResult<()> {
        let path = match (parent_path.is_empty(), self.instance_name.is_empty()) {
            (_, true) => parent_path.to_string(),
            (true, false) => self.instance_name.clone(),
            (false, false) => format!("{parent_path}.{}", self.instance_name),
        };
        if self.group {
            for child in &self.children {
                child.compile(program, platform, cancel, &path)?;
            }
            return Ok(());
        }
        debug!(pass = %path, type_name = %self.type_name, "running pass");
        let ctx = PassContext {
            platform,
            path: &path,
            options: &self.options,
            cancel,
        };
        self.imp
            .on_compile(program, &ctx)
            .map_err(|source| PassError::InPass {
                path,
                source: Box::new(source),
            })
    }

    /// Dump the configured strategy of this subtree.
    pub fn dump_strategy(&self, w: &mut impl fmt::Write, prefix: &str) -> fmt::Result {
        let label = if self.type_name.is_empty() {
            "group"
        } else {
            &self.type_name
        };
        let name = if self.instance_name.is_empty() {
            "<root>"
        } else {
            &self.instance_name
        };
        write!(w, "{prefix}{name} ({label})")?;
        let set_options: Vec<String> = self
            .options
            .iter()
            .filter(|(_, _, is_set)| *is_set)
            .map(|(name, value, _)| format!("{name}={value}"))
            .collect();
        if !set_options.is_empty() {
            write!(w, " [{}]", set_options.join(", "))?;
        }
        writeln!(w)?;
        for child in &self.children {
            child.dump_strategy(w, &format!("{prefix}  "))?;
        }
        Ok(())
    }
}
