use crate::scene::BlendMethod;

use super::layout::{FragmentNode, HEAD_SENTINEL};

/// Collects at most `budget` nodes of the list starting at `head`.
///
/// Stops at the sentinel or at a link pointing outside `nodes`.
pub fn collect_list(nodes: &[FragmentNode], head: u32, budget: usize, out: &mut Vec<FragmentNode>) {
    out.clear();
    let mut index = head;
    while index != HEAD_SENTINEL && out.len() < budget {
        let Some(node) = nodes.get(index as usize) else { break };
        out.push(*node);
        index = node.next;
    }
}

/// Resolves one pixel's fragments over `background`.
///
/// `Mix` sorts farthest-first and composites with "over"; `Mip` keeps the
/// per-channel maximum of premultiplied color. Same math as `fs_sort`.
pub fn resolve_pixel(layers: &mut [FragmentNode], background: [f32; 4], method: BlendMethod) -> [f32; 4] {
    let mut out = background;
    match method {
        BlendMethod::Mix => {
            layers.sort_by(|a, b| b.depth.total_cmp(&a.depth));
            for node in layers.iter() {
                let [r, g, b, a] = node.rgba();
                out = [
                    r * a + out[0] * (1.0 - a),
                    g * a + out[1] * (1.0 - a),
                    b * a + out[2] * (1.0 - a),
                    a + out[3] * (1.0 - a),
                ];
            }
        }
        BlendMethod::Mip => {
            for node in layers.iter() {
                let [r, g, b, a] = node.rgba();
                out = [out[0].max(r * a), out[1].max(g * a), out[2].max(b * a), out[3].max(a)];
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(depth: f32, rgba: [f32; 4], next: u32) -> FragmentNode {
        FragmentNode::new(depth, rgba, next)
    }

    #[test]
    fn collect_follows_links_until_sentinel() {
        let nodes = [
            node(0.5, [1.0, 0.0, 0.0, 1.0], HEAD_SENTINEL),
            node(0.2, [0.0, 1.0, 0.0, 1.0], 0),
        ];
        let mut out = Vec::new();
        collect_list(&nodes, 1, 8, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].depth, 0.2);
    }

    #[test]
    fn collect_respects_budget_and_bad_links() {
        let nodes = [node(0.5, [0.0; 4], 7)];
        let mut out = Vec::new();
        collect_list(&nodes, 0, 8, &mut out);
        assert_eq!(out.len(), 1);
        collect_list(&nodes, 0, 0, &mut out);
        assert!(out.is_empty());
        collect_list(&nodes, HEAD_SENTINEL, 8, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn mix_result_is_independent_of_list_order() {
        let red = node(0.8, [1.0, 0.0, 0.0, 0.5], 0);
        let blue = node(0.2, [0.0, 0.0, 1.0, 0.5], 0);
        let a = resolve_pixel(&mut [red, blue], [0.0, 0.0, 0.0, 1.0], BlendMethod::Mix);
        let b = resolve_pixel(&mut [blue, red], [0.0, 0.0, 0.0, 1.0], BlendMethod::Mix);
        assert_eq!(a, b);
        // Near blue is composited last, so it dominates.
        assert!(a[2] > a[0]);
    }

    #[test]
    fn mip_keeps_channel_maximum() {
        let out = resolve_pixel(
            &mut [node(0.1, [1.0, 0.0, 0.0, 1.0], 0), node(0.9, [0.0, 1.0, 0.0, 1.0], 0)],
            [0.0; 4],
            BlendMethod::Mip,
        );
        assert_eq!(out, [1.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn empty_list_yields_background() {
        let bg = [0.1, 0.2, 0.3, 1.0];
        assert_eq!(resolve_pixel(&mut [], bg, BlendMethod::Mix), bg);
    }
}
