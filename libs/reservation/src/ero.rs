/// One `src -> dst` leg of an ERO-segmented request ("Explicit
/// Route Objects"). `forbidden_next_hops` holds the ERO waypoints not yet
/// visited by this leg, rendered into the instance's `NextEroPorts` so the
/// solver is barred from hopping past them early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EroSegment {
    pub src: String,
    pub dst: String,
    pub forbidden_next_hops: Vec<String>,
}

/// Split `src -> p1 -> p2 -> ... -> pn -> dst` into `n + 1` independent
/// pathfind segments, each solved in turn with the previous segment's
/// egress port forced as the next segment's `src` (step 2). An
/// empty `ero` list yields the single `src -> dst` segment unchanged.
pub fn segment(src: &str, dst: &str, ero: &[String]) -> Vec<EroSegment> {
    if ero.is_empty() {
        return vec![EroSegment {
            src: src.to_string(),
            dst: dst.to_string(),
            forbidden_next_hops: Vec::new(),
        }];
    }

    let mut waypoints = Vec::with_capacity(ero.len() + 2);
    waypoints.push(src.to_string());
    waypoints.extend(ero.iter().cloned());
    waypoints.push(dst.to_string());

    (0..waypoints.len() - 1)
        .map(|i| {
            let not_yet_visited = waypoints[i + 2..].to_vec();
            EroSegment {
                src: waypoints[i].clone(),
                dst: waypoints[i + 1].clone(),
                forbidden_next_hops: not_yet_visited,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ero_yields_one_segment() {
        let segments = segment("A_IN", "C_OUT", &[]);
        assert_eq!(
            segments,
            vec![EroSegment {
                src: "A_IN".into(),
                dst: "C_OUT".into(),
                forbidden_next_hops: vec![],
            }]
        );
    }

    #[test]
    fn ero_splits_into_n_plus_one_segments_in_order() {
        let ero = vec!["P1".to_string(), "P2".to_string()];
        let segments = segment("A_IN", "D_OUT", &ero);

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].src, "A_IN");
        assert_eq!(segments[0].dst, "P1");
        assert_eq!(segments[0].forbidden_next_hops, vec!["P2", "D_OUT"]);

        assert_eq!(segments[1].src, "P1");
        assert_eq!(segments[1].dst, "P2");
        assert_eq!(segments[1].forbidden_next_hops, vec!["D_OUT"]);

        assert_eq!(segments[2].src, "P2");
        assert_eq!(segments[2].dst, "D_OUT");
        assert!(segments[2].forbidden_next_hops.is_empty());
    }

    #[test]
    fn every_waypoint_is_visited_exactly_once_across_segments() {
        let ero = vec!["P1".to_string(), "P2".to_string(), "P3".to_string()];
        let segments = segment("S", "D", &ero);

        let mut visited: Vec<String> = vec![segments[0].src.clone()];
        visited.extend(segments.iter().map(|s| s.dst.clone()));
        assert_eq!(visited, vec!["S", "P1", "P2", "P3", "D"]);
    }
}
