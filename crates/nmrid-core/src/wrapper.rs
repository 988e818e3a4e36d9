//! Lightweight facades over store objects.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use nmrid_types::{ClassKind, Handle, Pid, ID_SEPARATOR, PREFIX_SEPARATOR};

use crate::cache::{WrapperId, WrapperRecord};
use crate::descriptor;
use crate::error::{WrapError, WrapResult};
use crate::project::{Project, ProjectContext};

/// A facade over one store object.
///
/// A `Wrapper` is a cheap handle: the real state (pid, parent, children)
/// lives in the project's identity cache, addressed by [`WrapperId`]. Two
/// `Wrapper` values for the same object compare equal. Once the object is
/// deleted, or the project detached, queries fail with
/// [`WrapError::Evicted`] or [`WrapError::Detached`].
#[derive(Clone)]
pub struct Wrapper {
    id: WrapperId,
    handle: Handle,
    kind: ClassKind,
    ctx: Weak<ProjectContext>,
}

impl Wrapper {
    pub(crate) fn new(id: WrapperId, record: &WrapperRecord, ctx: Weak<ProjectContext>) -> Self {
        Self {
            id,
            handle: record.handle,
            kind: record.kind,
            ctx,
        }
    }

    pub fn id(&self) -> WrapperId {
        self.id
    }

    /// The wrapped store handle.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Short type tag, e.g. `MC`.
    pub fn type_tag(&self) -> &'static str {
        self.kind.short_name()
    }

    fn context(&self) -> WrapResult<Rc<ProjectContext>> {
        self.ctx
            .upgrade()
            .filter(|ctx| ctx.is_attached())
            .ok_or(WrapError::Detached)
    }

    fn record(&self) -> WrapResult<(Rc<ProjectContext>, WrapperRecord)> {
        let ctx = self.context()?;
        let record = ctx
            .cache()
            .get(self.id)
            .cloned()
            .ok_or(WrapError::Evicted { handle: self.handle })?;
        Ok((ctx, record))
    }

    /// Current pid. Recomputed on rename, so two calls may differ.
    pub fn pid(&self) -> WrapResult<Pid> {
        Ok(self.record()?.1.pid)
    }

    /// Pid rendered with the full class name.
    pub fn long_pid(&self) -> WrapResult<String> {
        Ok(self.pid()?.render_long())
    }

    /// Key parts contributed by this object, e.g. `["1", "ALA"]` for a residue.
    pub fn key(&self) -> WrapResult<Vec<String>> {
        Ok(self.pid()?.local_parts().to_vec())
    }

    /// Whether the wrapper is still cached.
    pub fn is_live(&self) -> bool {
        self.record().is_ok()
    }

    /// The owning project.
    pub fn project(&self) -> WrapResult<Project> {
        Ok(Project::from_context(self.context()?))
    }

    /// The containing wrapper, `None` for the project.
    pub fn parent(&self) -> WrapResult<Option<Wrapper>> {
        let (ctx, record) = self.record()?;
        Ok(record.parent.and_then(|parent| ctx.wrapper_for(parent)))
    }

    /// Every cached child, in creation order.
    pub fn direct_children(&self) -> WrapResult<Vec<Wrapper>> {
        let (ctx, _) = self.record()?;
        let ids = ctx.cache().children_of(self.id).to_vec();
        Ok(ids.into_iter().filter_map(|id| ctx.wrapper_for(id)).collect())
    }

    /// Cached children of `kind`.
    pub fn children(&self, kind: ClassKind) -> WrapResult<Vec<Wrapper>> {
        Ok(self
            .direct_children()?
            .into_iter()
            .filter(|child| child.kind == kind)
            .collect())
    }

    /// All cached descendants of `kind`, depth first. Empty when `kind`
    /// cannot occur below this class.
    pub fn descendants(&self, kind: ClassKind) -> WrapResult<Vec<Wrapper>> {
        let (ctx, _) = self.record()?;
        if !descriptor::descriptor(self.kind).contains_class(kind) {
            return Ok(Vec::new());
        }
        let ids: Vec<WrapperId> = {
            let cache = ctx.cache();
            cache
                .subtree(self.id)
                .into_iter()
                .skip(1)
                .filter(|id| cache.get(*id).is_some_and(|r| r.kind == kind))
                .collect()
        };
        Ok(ids.into_iter().filter_map(|id| ctx.wrapper_for(id)).collect())
    }

    /// Follow a plural link by name, e.g. `chain.plural("residues")` or
    /// `spectrum.plural("peaks")`.
    pub fn plural(&self, name: &str) -> WrapResult<Vec<Wrapper>> {
        let target = descriptor::by_plural_name(name)
            .filter(|d| descriptor::descriptor(self.kind).contains_class(d.kind))
            .ok_or_else(|| WrapError::UnknownPluralLink {
                kind: self.kind,
                name: name.to_string(),
            })?;
        self.descendants(target.kind)
    }

    /// Look up a descendant by its key relative to this wrapper, e.g.
    /// `chain.get_child(ClassKind::Residue, "1.ALA")`.
    pub fn get_child(&self, kind: ClassKind, relative_id: &str) -> WrapResult<Option<Wrapper>> {
        let (ctx, record) = self.record()?;
        if !descriptor::descriptor(self.kind).contains_class(kind) {
            return Ok(None);
        }
        let full_id = if self.kind == ClassKind::Project {
            relative_id.to_string()
        } else {
            format!("{}{}{}", record.pid.id(), ID_SEPARATOR, relative_id)
        };
        let pid = Pid::parse_with(
            &format!("{}{}{}", kind.short_name(), PREFIX_SEPARATOR, full_id),
            false,
        )?;
        let id = ctx.cache().lookup_by_pid(&pid);
        Ok(id.and_then(|id| ctx.wrapper_for(id)))
    }
}

impl PartialEq for Wrapper {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.ctx, &other.ctx)
    }
}

impl Eq for Wrapper {}

impl Hash for Wrapper {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pid() {
            Ok(pid) => write!(f, "<{pid}>"),
            Err(_) => write!(f, "<{}:{} gone>", self.type_tag(), self.handle),
        }
    }
}

impl fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapper")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nmrid_store::{DataStore, InMemoryStore, StoreClass};

    struct Fixture {
        store: Rc<InMemoryStore>,
        project: Project,
    }

    fn fixture() -> Fixture {
        let store = Rc::new(InMemoryStore::new("demo"));
        let root = store.root();
        let chain = store.create(root, StoreClass::MolChain, ["A"]).unwrap();
        for (seq, name) in [("1", "ALA"), ("2", "GLY")] {
            let res = store.create(chain, StoreClass::MolResidue, [seq, name]).unwrap();
            store.create(res, StoreClass::MolAtom, ["CA"]).unwrap();
        }
        let sp = store.create(root, StoreClass::DataSource, ["hsqc.2"]).unwrap();
        let pl = store.create(sp, StoreClass::PeakList, ["1"]).unwrap();
        store.create(pl, StoreClass::Peak, ["1"]).unwrap();
        let dyn_store: Rc<dyn DataStore> = store.clone();
        let project = Project::attach(dyn_store).unwrap();
        Fixture { store, project }
    }

    fn get(project: &Project, pid: &str) -> Wrapper {
        project.get_by_pid(pid).unwrap().unwrap()
    }

    #[test]
    fn identity_is_stable_across_lookups() {
        let f = fixture();
        let a = get(&f.project, "MC:A");
        let b = get(&f.project, "Chain:A");
        assert_eq!(a, b);
        assert_eq!(f.project.get_by_handle(a.handle()), Some(a.clone()));
        assert_eq!(a.type_tag(), "MC");
        assert_eq!(a.long_pid().unwrap(), "Chain:A");
    }

    #[test]
    fn parent_and_children() {
        let f = fixture();
        let chain = get(&f.project, "MC:A");
        let residues = chain.children(ClassKind::Residue).unwrap();
        let pids: Vec<String> = residues.iter().map(|r| r.pid().unwrap().render()).collect();
        assert_eq!(pids, vec!["MR:A.1.ALA", "MR:A.2.GLY"]);
        assert_eq!(residues[0].parent().unwrap(), Some(chain.clone()));
        assert_eq!(residues[0].key().unwrap(), vec!["1".to_string(), "ALA".to_string()]);
        assert_eq!(
            chain.parent().unwrap().unwrap().pid().unwrap().render(),
            "PR:demo"
        );
        assert!(f.project.as_wrapper().unwrap().parent().unwrap().is_none());
    }

    #[test]
    fn descendants_and_plural_links() {
        let f = fixture();
        let root = f.project.as_wrapper().unwrap();
        assert_eq!(root.descendants(ClassKind::Atom).unwrap().len(), 2);
        assert_eq!(f.project.plural("peaks").unwrap().len(), 1);
        let chain = get(&f.project, "MC:A");
        assert_eq!(chain.plural("atoms").unwrap().len(), 2);
        assert!(chain.descendants(ClassKind::Peak).unwrap().is_empty());
        assert!(matches!(
            chain.plural("peaks"),
            Err(WrapError::UnknownPluralLink { .. })
        ));
    }

    #[test]
    fn relative_lookup() {
        let f = fixture();
        let chain = get(&f.project, "MC:A");
        let res = chain.get_child(ClassKind::Residue, "2.GLY").unwrap().unwrap();
        assert_eq!(res.pid().unwrap().render(), "MR:A.2.GLY");
        let atom = res.get_child(ClassKind::Atom, "CA").unwrap().unwrap();
        assert_eq!(atom.pid().unwrap().render(), "MA:A.2.GLY.CA");
        assert!(chain.get_child(ClassKind::Residue, "9.TRP").unwrap().is_none());
        assert!(chain.get_child(ClassKind::Peak, "1").unwrap().is_none());

        let root = f.project.as_wrapper().unwrap();
        let peak = root.get_child(ClassKind::Peak, "hsqc^2.1.1").unwrap().unwrap();
        assert_eq!(peak.pid().unwrap().parts()[0], "hsqc.2");
    }

    #[test]
    fn deleted_wrapper_reports_evicted() {
        let f = fixture();
        let res = get(&f.project, "MR:A.1.ALA");
        f.store.delete(res.handle()).unwrap();
        assert!(!res.is_live());
        assert!(matches!(res.pid(), Err(WrapError::Evicted { .. })));
        assert!(res.to_string().contains("gone"));
    }

    #[test]
    fn detached_wrapper_reports_detached() {
        let f = fixture();
        let chain = get(&f.project, "MC:A");
        f.project.detach();
        assert!(matches!(chain.pid(), Err(WrapError::Detached)));
        assert!(matches!(chain.project(), Err(WrapError::Detached)));
    }

    #[test]
    fn project_backreference() {
        let f = fixture();
        let chain = get(&f.project, "MC:A");
        let project = chain.project().unwrap();
        assert_eq!(project.name().unwrap(), "demo");
        assert_eq!(chain.to_string(), "<MC:A>");
    }
}
