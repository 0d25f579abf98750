//! Lazy navigation tree over the component and history spaces.

use haystack_types::Dict;
use nhaystack_station::{Component, Station};

use crate::context::Context;
use crate::correlate;
use crate::error::{HaystackError, Result};
use crate::ids::{COMPONENT_SPACE, EntityId, HISTORY_SPACE};
use crate::tags;

/// One row of a nav response.
#[derive(Debug, Clone, PartialEq)]
pub struct NavNode {
    /// Present only when the node can be expanded further
    pub nav_id: Option<String>,
    pub tags: Dict,
}

impl NavNode {
    pub fn to_dict(&self) -> Dict {
        let mut dict = Dict::new();
        if let Some(nav_id) = &self.nav_id {
            dict.add("navId", nav_id.as_str());
        }
        dict.merge(&self.tags);
        dict
    }
}

/// The top level: one node per space.
pub fn roots<S: Station + ?Sized>(ctx: Context<'_, S>) -> Vec<NavNode> {
    [(COMPONENT_SPACE, "ComponentSpace"), (HISTORY_SPACE, "HistorySpace")]
        .into_iter()
        .map(|(space, dis)| {
            let mut tags = Dict::new();
            tags.add("dis", dis);
            NavNode {
                nav_id: Some(ctx.ids.space_id(space)),
                tags,
            }
        })
        .collect()
}

/// Children of `nav_id`.
///
/// `<station>:c` yields the station root, `<station>:h` every visible
/// history and `<station>:c.<id>` the immediate children of that
/// component. Anything else is a lookup failure.
pub fn children<S: Station + ?Sized>(ctx: Context<'_, S>, nav_id: &str) -> Result<Vec<NavNode>> {
    let station = ctx.station;

    if nav_id == ctx.ids.space_id(COMPONENT_SPACE) {
        let root = station
            .component(station.root())
            .ok_or_else(|| HaystackError::Lookup(nav_id.to_string()))?;
        return Ok(vec![make_nav_node(ctx, root)]);
    }

    if nav_id == ctx.ids.space_id(HISTORY_SPACE) {
        return Ok(history_nodes(ctx));
    }

    match ctx.ids.parse(nav_id) {
        Some(EntityId::Component(handle)) => {
            if station.component(handle).is_none() {
                return Err(HaystackError::Lookup(nav_id.to_string()));
            }
            Ok(station
                .children(handle)
                .into_iter()
                .map(|child| make_nav_node(ctx, child))
                .collect())
        }
        _ => Err(HaystackError::Lookup(nav_id.to_string())),
    }
}

fn history_nodes<S: Station + ?Sized>(ctx: Context<'_, S>) -> Vec<NavNode> {
    ctx.station
        .histories()
        .into_iter()
        .filter_map(|cfg| {
            let paired = correlate::paired_point(ctx, cfg);
            tags::is_visible_history(ctx.config.show_linked_histories, paired).then(|| NavNode {
                nav_id: None,
                tags: tags::project_history(ctx, cfg, paired),
            })
        })
        .collect()
}

fn make_nav_node<S: Station + ?Sized>(ctx: Context<'_, S>, comp: &Component) -> NavNode {
    let nav_id = (!ctx.station.children(comp.handle).is_empty())
        .then(|| ctx.ids.component_ref(comp.handle).val);

    let tags = if tags::is_visible(comp) {
        tags::project(ctx, comp)
    } else {
        // Structural nodes are not projected
        let mut tags = Dict::new();
        if let Some(dis) = comp.display() {
            tags.add("dis", dis);
        }
        tags.add("axType", comp.type_spec.as_str());
        tags.add("axSlotPath", comp.slot_path.as_str());
        tags
    };
    NavNode { nav_id, tags }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HaystackConfig;
    use crate::ids::IdentityMap;
    use crate::testing::{Env, SimpleStation};
    use nhaystack_station::MemoryStation;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_roots() {
        let fx = SimpleStation::new();
        let env = Env::default();
        let rows: Vec<Dict> = roots(env.ctx(&fx.station)).iter().map(NavNode::to_dict).collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get_str("navId"), Some("nhaystack_simple:c"));
        assert_eq!(rows[0].dis(), Some("ComponentSpace"));
        assert_eq!(rows[1].get_str("navId"), Some("nhaystack_simple:h"));
        assert_eq!(rows[1].dis(), Some("HistorySpace"));
    }

    #[test]
    fn test_component_space_root() {
        let fx = SimpleStation::new();
        let env = Env::default();
        let nodes = children(env.ctx(&fx.station), "nhaystack_simple:c").unwrap();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].nav_id.as_deref(), Some("nhaystack_simple:c.MQ~~"));
        assert_eq!(nodes[0].tags.get_str("axSlotPath"), Some("slot:/"));
        assert_eq!(nodes[0].tags.dis(), Some("nhaystack_simple"));
    }

    #[test]
    fn test_childless_root_has_no_nav_id() {
        let station = MemoryStation::new("s", "UTC");
        let config = HaystackConfig::default();
        let ids = IdentityMap::new("s");
        let nodes = children(Context::new(&station, &config, &ids), "s:c").unwrap();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].nav_id, None);
        assert_eq!(nodes[0].tags.get_str("axSlotPath"), Some("slot:/"));
    }

    #[test]
    fn test_only_non_leaves_expose_nav_id() {
        let fx = SimpleStation::new();
        let env = Env::default();
        let ctx = env.ctx(&fx.station);
        let foo = ctx.ids.component_ref(fx.foo).val;
        let nodes = children(ctx, &foo).unwrap();

        let slots: Vec<_> = nodes.iter().map(|n| n.tags.get_str("axSlotPath").unwrap()).collect();
        assert_eq!(slots, vec!["slot:/Foo/SineWave1", "slot:/Foo/SineWave2", "slot:/Foo/comp"]);

        // SineWave1 has its history extension below it
        assert_eq!(nodes[0].nav_id.as_deref(), Some("nhaystack_simple:c.OTk~"));
        assert_eq!(nodes[1].nav_id, None);
        assert_eq!(nodes[2].nav_id, None);
        assert!(nodes[0].tags.has("point") && nodes[0].tags.has("curVal"));
    }

    #[test]
    fn test_structural_nodes_are_minimal() {
        let fx = SimpleStation::new();
        let env = Env::default();
        let ctx = env.ctx(&fx.station);
        let root = ctx.ids.component_ref(ctx.station.root()).val;
        let nodes = children(ctx, &root).unwrap();

        let services = nodes
            .iter()
            .find(|n| n.tags.get_str("axSlotPath") == Some("slot:/Services"))
            .unwrap();
        assert!(services.nav_id.is_some());
        assert_eq!(services.tags.names().collect::<Vec<_>>(), vec!["dis", "axType", "axSlotPath"]);

        let ahu = nodes
            .iter()
            .find(|n| n.tags.get_str("axSlotPath") == Some("slot:/AHU1"))
            .unwrap();
        assert!(ahu.tags.has("equip") && ahu.tags.has("id"));
    }

    #[test]
    fn test_history_space() {
        let fx = SimpleStation::new();
        let hidden = Env::default();
        let nodes = children(hidden.ctx(&fx.station), "nhaystack_simple:h").unwrap();
        let names: Vec<_> = nodes.iter().map(|n| n.tags.dis().unwrap()).collect();
        assert_eq!(names, vec!["AuditHistory", "LogHistory", "RAT"]);
        assert!(nodes.iter().all(|n| n.nav_id.is_none()));

        let shown = Env::new(HaystackConfig::default().with_linked_histories(true));
        let nodes = children(shown.ctx(&fx.station), "nhaystack_simple:h").unwrap();
        assert_eq!(nodes.len(), 6);
    }

    #[test]
    fn test_unknown_nav_ids() {
        let fx = SimpleStation::new();
        let env = Env::default();
        let ctx = env.ctx(&fx.station);

        for nav_id in [
            "bogus",
            "other_station:c",
            "nhaystack_simple:x",
            "nhaystack_simple:c.OTk5OQ~~",
            "nhaystack_simple:h.L25oYXlzdGFja19zaW1wbGUvTG9nSGlzdG9yeQ~~",
        ] {
            let err = children(ctx, nav_id).unwrap_err();
            assert!(matches!(err, HaystackError::Lookup(ref id) if id == nav_id), "{}", nav_id);
        }
    }
}
