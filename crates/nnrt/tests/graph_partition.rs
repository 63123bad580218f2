use nnrt::graph::DependencyGraph;

#[test]
fn kahn_order_respects_dependencies() {
    let mut graph = DependencyGraph::new(3);
    graph.add_node(0, &[0], &[1]).unwrap();
    graph.add_node(1, &[1], &[2]).unwrap();
    graph.add_node(2, &[2], &[3]).unwrap();
    assert_eq!(graph.topological_sort().unwrap(), [0, 1, 2]);
}

#[test]
fn unconnected_nodes_keep_id_order() {
    let graph = DependencyGraph::new(4);
    assert_eq!(graph.topological_sort().unwrap(), [0, 1, 2, 3]);
}

#[test]
fn nodes_register_in_any_order() {
    // consumer first, producer later; the edge appears once both ends exist
    let mut graph = DependencyGraph::new(3);
    graph.add_node(2, &[2], &[3]).unwrap();
    graph.add_node(1, &[1], &[2]).unwrap();
    graph.add_node(0, &[0], &[1]).unwrap();
    assert_eq!(graph.topological_sort().unwrap(), [0, 1, 2]);
}

#[test]
fn cycles_are_fatal() {
    let mut graph = DependencyGraph::new(2);
    graph.add_node(0, &[1], &[2]).unwrap();
    graph.add_node(1, &[2], &[1]).unwrap();
    let err = graph.topological_sort().unwrap_err();
    assert!(err.to_string().contains("cycle"));
}

#[test]
fn unknown_node_ids_are_rejected() {
    let mut graph = DependencyGraph::new(1);
    assert!(graph.set_color(1, true).is_err());
    assert!(graph.add_node(1, &[], &[]).is_err());
}

#[test]
fn an_empty_graph_has_no_partitions() {
    let graph = DependencyGraph::new(0);
    assert!(graph.partition(false).unwrap().is_empty());
}

#[test]
fn a_single_color_stays_in_one_partition() {
    let mut graph = DependencyGraph::new(3);
    graph.add_node(0, &[0], &[1]).unwrap();
    graph.add_node(1, &[1], &[2]).unwrap();
    graph.add_node(2, &[2], &[3]).unwrap();
    graph.identify_input_output_values(&[0], &[3]);

    let partitions = graph.partition(false).unwrap();
    assert_eq!(partitions.len(), 1);
    assert_eq!(partitions[0].node_ids, [0, 1, 2]);
    assert_eq!(partitions[0].input_ids, [0]);
    assert_eq!(partitions[0].output_ids, [3]);
}

#[test]
fn a_diamond_splits_into_three_stages() {
    // 0 feeds 1 and 2 through one value, 3 joins them; 0 and 3 share a
    // color, 1 and 2 carry the other
    let mut graph = DependencyGraph::new(4);
    graph.add_node(0, &[0], &[1]).unwrap();
    graph.add_node(1, &[1], &[2]).unwrap();
    graph.add_node(2, &[1], &[3]).unwrap();
    graph.add_node(3, &[2, 3], &[4]).unwrap();
    graph.set_color(0, true).unwrap();
    graph.set_color(3, true).unwrap();
    graph.identify_input_output_values(&[0], &[4]);

    let levels = graph.bi_topological_sort().unwrap();
    assert_eq!(levels, [vec![0], vec![1, 2], vec![3]]);

    let partitions = graph.partition(false).unwrap();
    assert_eq!(partitions.len(), 3);
    assert_eq!(partitions[0].node_ids, [0]);
    assert_eq!(partitions[1].node_ids, [1, 2]);
    assert_eq!(partitions[2].node_ids, [3]);

    assert_eq!(partitions[0].input_ids, [0]);
    assert_eq!(partitions[0].output_ids, [1]);
    assert_eq!(partitions[1].input_ids, [1]);
    assert_eq!(partitions[1].output_ids, [2, 3]);
    assert_eq!(partitions[2].input_ids, [2, 3]);
    assert_eq!(partitions[2].output_ids, [4]);
}

#[test]
fn a_three_branch_lattice_partitions_by_color() {
    // three chains hang off node 0 and converge on node 7; the starred
    // nodes carry one color, the rest the other
    //
    //        0*
    //      / | \
    //     1  2  3*
    //     |  |  |
    //     4  5* 6
    //      \ | /
    //        7*
    let mut graph = DependencyGraph::new(8);
    graph.add_node(0, &[0], &[1, 2, 3]).unwrap();
    graph.add_node(1, &[1], &[4]).unwrap();
    graph.add_node(2, &[2], &[5]).unwrap();
    graph.add_node(3, &[3], &[6]).unwrap();
    graph.add_node(4, &[4], &[7]).unwrap();
    graph.add_node(5, &[5], &[8]).unwrap();
    graph.add_node(6, &[6], &[9]).unwrap();
    graph.add_node(7, &[7, 8, 9], &[10]).unwrap();
    for node in [0, 3, 5, 7] {
        graph.set_color(node, true).unwrap();
    }
    graph.identify_input_output_values(&[0], &[10]);

    let partitions = graph.partition(false).unwrap();
    let stages: Vec<Vec<usize>> = partitions.iter().map(|p| p.node_ids.clone()).collect();
    assert_eq!(stages, [vec![0, 3], vec![1, 2, 4, 6], vec![5, 7]]);

    assert_eq!(partitions[0].input_ids, [0]);
    assert_eq!(partitions[0].output_ids, [1, 2, 6]);
    assert_eq!(partitions[1].input_ids, [1, 2, 6]);
    assert_eq!(partitions[1].output_ids, [5, 7, 9]);
    assert_eq!(partitions[2].input_ids, [5, 7, 9]);
    assert_eq!(partitions[2].output_ids, [10]);
}

#[test]
fn every_value_between_two_nodes_crosses_the_boundary() {
    // two values flow from node 0 to node 1; a color split carries both
    let mut graph = DependencyGraph::new(2);
    graph.add_node(0, &[0], &[1, 2]).unwrap();
    graph.add_node(1, &[1, 2], &[3]).unwrap();
    graph.set_color(1, true).unwrap();
    graph.identify_input_output_values(&[0], &[3]);

    let partitions = graph.partition(false).unwrap();
    assert_eq!(partitions.len(), 2);
    assert_eq!(partitions[0].output_ids, [1, 2]);
    assert_eq!(partitions[1].input_ids, [1, 2]);
}

#[test]
fn eager_mode_isolates_every_node() {
    let mut graph = DependencyGraph::new(3);
    graph.add_node(0, &[0], &[1]).unwrap();
    graph.add_node(1, &[1], &[2]).unwrap();
    graph.add_node(2, &[2], &[3]).unwrap();
    graph.identify_input_output_values(&[0], &[3]);

    let partitions = graph.partition(true).unwrap();
    assert_eq!(partitions.len(), 3);
    for (i, partition) in partitions.iter().enumerate() {
        assert_eq!(partition.node_ids, [i]);
        assert_eq!(partition.input_ids, [i]);
        assert_eq!(partition.output_ids, [i + 1]);
    }
}
