//! End-to-end program evaluation.

use kiwi_eval::{EvalError, Executor, ExecutorConfig, RunState, QUESTION_KEY};
use kiwi_types::{
    Attribute, EqualKind, Node, OpKind, Program, ProgramError, Relationships, Scene, SceneObject,
    TextAnnotation, Value,
};
use std::collections::BTreeMap;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn object(color: &str, shape: &str, text: &str) -> SceneObject {
    SceneObject::new()
        .with(Attribute::Color, color)
        .with(Attribute::Shape, shape)
        .with(Attribute::Text, TextAnnotation::new(text))
}

/// 0: red cube "k", 1: blue sphere "stop", 2: red sphere "go".
/// Object 1 has nothing to its left.
fn shapes_scene() -> Scene {
    let mut relations = BTreeMap::new();
    relations.insert("left".to_string(), vec![vec![1], vec![], vec![]]);
    relations.insert("right".to_string(), vec![vec![], vec![0], vec![]]);
    Scene::new(
        vec![
            object("red", "cube", "k"),
            object("blue", "sphere", "stop"),
            object("red", "sphere", "go"),
        ],
        Relationships::Adjacency(relations),
    )
}

fn filter(attribute: Attribute, input: usize, literal: &str) -> Node {
    Node::new(OpKind::Filter(attribute))
        .with_inputs([input])
        .with_side_input(literal)
}

fn step(kind: OpKind, inputs: impl IntoIterator<Item = usize>) -> Node {
    Node::new(kind).with_inputs(inputs)
}

fn relate(input: usize, relation: &str) -> Node {
    step(OpKind::Relate, [input]).with_side_input(relation)
}

fn evaluate(program: &mut Program, scene: &Scene) -> Result<Value, EvalError> {
    Executor::new().evaluate(program, scene, &RunState::new())
}

// ══════════════════════════════════════════════════════════════════════════════
// Answers
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn filter_on_scene_lists_matching_objects() {
    init_tracing();
    let mut program = Program::new(vec![Node::scene(), filter(Attribute::Color, 0, "red")]);
    assert_eq!(
        evaluate(&mut program, &shapes_scene()),
        Ok(Value::Objects(vec![0, 2]))
    );
}

#[test]
fn unique_of_two_objects_is_invalid() {
    let scene = shapes_scene();
    let mut program = Program::new(vec![
        Node::scene(),
        filter(Attribute::Color, 0, "red"),
        step(OpKind::Unique, [1]),
    ]);
    assert_eq!(evaluate(&mut program, &scene), Ok(Value::Invalid));

    let trace = Executor::new()
        .trace(&mut program.structural_copy(), &scene, &RunState::new())
        .unwrap();
    assert_eq!(trace.len(), 3);
    assert!(trace.last().unwrap().is_invalid());
}

#[test]
fn relate_from_unique_object_to_exist() {
    init_tracing();
    let scene = shapes_scene();
    let mut program = Program::new(vec![
        Node::scene(),
        filter(Attribute::Color, 0, "blue"),
        step(OpKind::Unique, [1]),
        relate(2, "left"),
        step(OpKind::Exist, [3]),
    ]);
    let trace = Executor::new()
        .trace(&mut program, &scene, &RunState::new())
        .unwrap();
    assert_eq!(
        trace,
        vec![
            Value::Objects(vec![0, 1, 2]),
            Value::Objects(vec![1]),
            Value::Object(1),
            Value::Objects(vec![]),
            Value::Bool(false),
        ]
    );
}

#[test]
fn count_same_color_objects() {
    let mut program = Program::new(vec![
        Node::scene(),
        filter(Attribute::Shape, 0, "cube"),
        step(OpKind::Unique, [1]),
        step(OpKind::Same(Attribute::Color), [2]),
        step(OpKind::Count, [3]),
    ]);
    assert_eq!(evaluate(&mut program, &shapes_scene()), Ok(Value::Integer(1)));
}

#[test]
fn compare_colors_of_two_objects() {
    let mut program = Program::new(vec![
        Node::scene(),
        filter(Attribute::Shape, 0, "cube"),
        step(OpKind::Unique, [1]),
        step(OpKind::Query(Attribute::Color), [2]),
        filter(Attribute::Text, 0, "go"),
        step(OpKind::Unique, [4]),
        step(OpKind::Query(Attribute::Color), [5]),
        step(OpKind::Equal(EqualKind::Attribute(Attribute::Color)), [3, 6]),
    ]);
    assert_eq!(evaluate(&mut program, &shapes_scene()), Ok(Value::Bool(true)));
}

#[test]
fn union_then_count_is_greater_than_intersect() {
    let mut program = Program::new(vec![
        Node::scene(),
        filter(Attribute::Color, 0, "red"),
        filter(Attribute::Shape, 0, "sphere"),
        step(OpKind::Union, [1, 2]),
        step(OpKind::Intersect, [1, 2]),
        step(OpKind::Count, [3]),
        step(OpKind::Count, [4]),
        step(OpKind::GreaterThan, [5, 6]),
    ]);
    let trace = Executor::new()
        .trace(&mut program, &shapes_scene(), &RunState::new())
        .unwrap();
    assert_eq!(trace[3], Value::Objects(vec![0, 1, 2]));
    assert_eq!(trace[4], Value::Objects(vec![2]));
    assert_eq!(trace[7], Value::Bool(true));
}

// ══════════════════════════════════════════════════════════════════════════════
// Short-circuit on INVALID
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn invalid_stops_evaluation() {
    let scene = shapes_scene();
    let mut program = Program::new(vec![
        Node::scene(),
        filter(Attribute::Color, 0, "green"),
        step(OpKind::Unique, [1]),
        relate(2, "left"),
        step(OpKind::Count, [3]),
    ]);
    let trace = Executor::new()
        .trace(&mut program, &scene, &RunState::new())
        .unwrap();
    assert_eq!(trace.len(), 3);
    assert_eq!(trace[2], Value::Invalid);
    assert!(program.nodes[3].cached_output().is_none());
    assert!(program.nodes[4].cached_output().is_none());
}

#[test]
fn invalid_answer_from_query_on_token_list() {
    let scene = Scene::new(
        vec![SceneObject::new().with(
            Attribute::Color,
            vec!["white".to_string(), "brown".to_string()],
        )],
        Relationships::default(),
    );
    let mut program = Program::new(vec![
        Node::scene(),
        step(OpKind::Unique, [0]),
        step(OpKind::Query(Attribute::Color), [1]),
        step(OpKind::Equal(EqualKind::Attribute(Attribute::Color)), [2, 2]),
    ]);
    let trace = Executor::new()
        .trace(&mut program, &scene, &RunState::new())
        .unwrap();
    assert_eq!(trace.len(), 3);
    assert_eq!(evaluate(&mut program, &scene), Ok(Value::Invalid));
}

// ══════════════════════════════════════════════════════════════════════════════
// Determinism and caching
// ══════════════════════════════════════════════════════════════════════════════

fn relational_program() -> Program {
    Program::new(vec![
        Node::scene(),
        filter(Attribute::Color, 0, "blue"),
        step(OpKind::Unique, [1]),
        relate(2, "right"),
        step(OpKind::Count, [3]),
    ])
}

#[test]
fn evaluation_determinism_100_iterations() {
    let scene = shapes_scene();
    let first = evaluate(&mut relational_program(), &scene).unwrap();
    assert_eq!(first, Value::Integer(1));
    for i in 0..100 {
        let answer = evaluate(&mut relational_program(), &scene).unwrap();
        assert_eq!(first, answer, "Determinism failure at iteration {i}");
    }
}

#[test]
fn outputs_are_cached_on_nodes() {
    let scene = shapes_scene();
    let mut program = relational_program();
    evaluate(&mut program, &scene).unwrap();
    assert_eq!(program.bound_scene(), Some(scene.fingerprint()));
    assert_eq!(
        program.nodes[3].cached_output(),
        Some(&Value::Objects(vec![0]))
    );
    assert_eq!(program.nodes[4].cached_output(), Some(&Value::Integer(1)));
}

#[test]
fn cached_outputs_are_reused_for_the_same_scene() {
    let scene = shapes_scene();
    let mut program = relational_program();
    evaluate(&mut program, &scene).unwrap();

    // A cached value is trusted as-is while the scene is unchanged.
    program.nodes[3].cache_output(Value::Objects(vec![0, 2]));
    program.nodes[4].clear_cached_output();
    assert_eq!(evaluate(&mut program, &scene), Ok(Value::Integer(2)));
}

#[test]
fn caches_from_another_scene_are_discarded() {
    let scene = shapes_scene();
    let mut program = relational_program();
    assert_eq!(evaluate(&mut program, &scene), Ok(Value::Integer(1)));

    let mut other = shapes_scene();
    other.objects_mut().push(object("purple", "cone", "z"));
    let mut relations = BTreeMap::new();
    relations.insert(
        "right".to_string(),
        vec![vec![], vec![0, 2, 3], vec![], vec![]],
    );
    other.set_relationships(Relationships::Adjacency(relations));

    assert_eq!(evaluate(&mut program, &other), Ok(Value::Integer(3)));
    assert_eq!(program.bound_scene(), Some(other.fingerprint()));
    assert_eq!(evaluate(&mut program, &scene), Ok(Value::Integer(1)));
}

#[test]
fn caching_can_be_disabled() {
    let executor = Executor::with_config(ExecutorConfig {
        cache_outputs: false,
        ..ExecutorConfig::default()
    });
    let scene = shapes_scene();
    let mut program = relational_program();
    program.nodes[4].cache_output(Value::Integer(99));

    assert_eq!(
        executor.evaluate(&mut program, &scene, &RunState::new()),
        Ok(Value::Integer(1))
    );
    assert_eq!(program.nodes[4].cached_output(), Some(&Value::Integer(99)));
    assert!(program.nodes[3].cached_output().is_none());
    assert_eq!(program.bound_scene(), None);
}

#[test]
fn executor_config_json_defaults() {
    let config: ExecutorConfig = serde_json::from_str(r#"{"cache_outputs": false}"#).unwrap();
    assert!(!config.cache_outputs);
    assert_eq!(config.question_key, QUESTION_KEY);
    assert_eq!(
        serde_json::from_str::<ExecutorConfig>("{}").unwrap(),
        ExecutorConfig::default()
    );
}

#[test]
fn question_text_is_not_served_from_cache() {
    let scene = shapes_scene();
    let executor = Executor::new();
    let mut program = text_question();

    let yes = RunState::new().with(QUESTION_KEY, Value::literal("k"));
    assert_eq!(
        executor.evaluate(&mut program, &scene, &yes),
        Ok(Value::Bool(true))
    );
    let no = RunState::new().with(QUESTION_KEY, Value::literal("stop"));
    assert_eq!(
        executor.evaluate(&mut program, &scene, &no),
        Ok(Value::Bool(false))
    );

    // Scene-only steps stay cached, run-state steps never are.
    assert_eq!(
        program.nodes[4].cached_output(),
        Some(&Value::literal("k"))
    );
    assert!(program.nodes[5].cached_output().is_none());
    assert!(program.nodes[6].cached_output().is_none());

    assert_eq!(
        executor.evaluate(&mut program, &scene, &RunState::new()),
        Err(EvalError::MissingRunValue(QUESTION_KEY.to_string()))
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Question text
// ══════════════════════════════════════════════════════════════════════════════

/// "Is the text on the red cube <T>?"
fn text_question() -> Program {
    Program::new(vec![
        Node::scene(),
        filter(Attribute::Color, 0, "red"),
        filter(Attribute::Shape, 1, "cube"),
        step(OpKind::Unique, [2]),
        step(OpKind::QueryTextTerminal, [3]),
        Node::new(OpKind::QueryTextQuestion),
        step(OpKind::Equal(EqualKind::Attribute(Attribute::Text)), [4, 5]),
    ])
}

#[test]
fn question_text_comes_from_run_state() {
    let scene = shapes_scene();
    let executor = Executor::new();

    let yes = RunState::new().with(QUESTION_KEY, Value::literal("k"));
    assert_eq!(
        executor.evaluate(&mut text_question(), &scene, &yes),
        Ok(Value::Bool(true))
    );

    let no = RunState::new().with(QUESTION_KEY, Value::literal("stop"));
    assert_eq!(
        executor.evaluate(&mut text_question(), &scene, &no),
        Ok(Value::Bool(false))
    );
}

#[test]
fn question_text_side_input_names_the_key() {
    let scene = shapes_scene();
    let mut program = Program::new(vec![
        Node::new(OpKind::QueryTextQuestion).with_side_input("<T2>"),
    ]);
    let state = RunState::new()
        .with(QUESTION_KEY, Value::literal("k"))
        .with("<T2>", Value::literal("go"));
    assert_eq!(
        Executor::new().evaluate(&mut program, &scene, &state),
        Ok(Value::literal("go"))
    );
}

#[test]
fn question_key_is_configurable() {
    let executor = Executor::with_config(ExecutorConfig {
        question_key: "<Q>".into(),
        ..ExecutorConfig::default()
    });
    let mut program = Program::new(vec![Node::new(OpKind::QueryTextQuestion)]);
    let state = RunState::new().with("<Q>", Value::literal("stop"));
    assert_eq!(
        executor.evaluate(&mut program, &shapes_scene(), &state),
        Ok(Value::literal("stop"))
    );
}

#[test]
fn missing_question_text_is_an_error() {
    assert_eq!(
        evaluate(&mut text_question(), &shapes_scene()),
        Err(EvalError::MissingRunValue(QUESTION_KEY.to_string()))
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Contract violations
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn empty_program_is_rejected() {
    assert_eq!(
        evaluate(&mut Program::default(), &shapes_scene()),
        Err(EvalError::Program(ProgramError::Empty))
    );
}

#[test]
fn forward_reference_is_rejected() {
    let mut program = Program::new(vec![
        Node::scene(),
        step(OpKind::Count, [2]),
        Node::scene(),
    ]);
    assert_eq!(
        evaluate(&mut program, &shapes_scene()),
        Err(EvalError::Program(ProgramError::ForwardReference {
            node: 1,
            input: 2
        }))
    );
}

#[test]
fn handler_errors_propagate() {
    let mut program = Program::new(vec![
        Node::scene(),
        step(OpKind::Filter(Attribute::Color), [0]),
    ]);
    assert_eq!(
        evaluate(&mut program, &shapes_scene()),
        Err(EvalError::SideInputArity {
            kind: OpKind::Filter(Attribute::Color),
            expected: 1,
            got: 0
        })
    );

    let mut program = Program::new(vec![Node::scene(), relate(0, "left")]);
    let err = evaluate(&mut program, &shapes_scene()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "relate expects object, got object list"
    );
}

#[test]
fn question_text_takes_no_inputs_and_one_key() {
    let state = RunState::new().with(QUESTION_KEY, Value::literal("k"));
    let executor = Executor::new();

    let mut program = Program::new(vec![
        Node::scene(),
        step(OpKind::QueryTextQuestion, [0]),
    ]);
    assert_eq!(
        executor.evaluate(&mut program, &shapes_scene(), &state),
        Err(EvalError::InputArity {
            kind: OpKind::QueryTextQuestion,
            expected: 0,
            got: 1
        })
    );

    let mut program = Program::new(vec![Node::new(OpKind::QueryTextQuestion)
        .with_side_input(QUESTION_KEY)
        .with_side_input("<T2>")]);
    assert_eq!(
        executor.evaluate(&mut program, &shapes_scene(), &state),
        Err(EvalError::SideInputArity {
            kind: OpKind::QueryTextQuestion,
            expected: 1,
            got: 2
        })
    );
}

#[test]
fn trace_ends_with_the_answer() {
    let scene = shapes_scene();
    let answer = evaluate(&mut relational_program(), &scene).unwrap();
    let trace = Executor::new()
        .trace(&mut relational_program(), &scene, &RunState::new())
        .unwrap();
    assert_eq!(trace.len(), 5);
    assert_eq!(trace.last(), Some(&answer));
}

#[test]
fn program_from_json_evaluates() {
    let mut program: Program = serde_json::from_str(
        r#"{"nodes": [
            {"type": "scene", "inputs": []},
            {"type": "filter_color", "inputs": [0], "side_inputs": ["red"]},
            {"type": "filter_shape", "inputs": [1], "side_inputs": ["sphere"]},
            {"type": "unique", "inputs": [2]},
            {"type": "query_text", "inputs": [3]}
        ]}"#,
    )
    .unwrap();
    assert_eq!(
        evaluate(&mut program, &shapes_scene()),
        Ok(Value::literal("go"))
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Rendered scenes
// ══════════════════════════════════════════════════════════════════════════════

/// Two objects as the renderer writes them for one camera view.
const RENDERED_SCENE: &str = r#"{
  "objects": [
    {
      "shape": "cylinder",
      "size": "large",
      "material": "metal",
      "3d_coords": [-2.1, 1.35, 0.7],
      "rotation": 47.9,
      "pixel_coords": [148, 172, 10.4],
      "color": "purple",
      "text": {
        "font": "Bfont",
        "body": "q",
        "3d_coords": [-2.1, 1.35, 1.45],
        "pixel_coords": [0.3084, 0.5375],
        "color": "yellow",
        "char_bboxes": {"cc": [{"id": "Text.000", "bbox": [140, 160, 12, 15], "visible_pixels": 96}]},
        "word_bboxes": {"cc": [[140, 160, 12, 15]]}
      }
    },
    {
      "shape": "cube",
      "size": "small",
      "material": "rubber",
      "3d_coords": [1.8, -0.4, 0.35],
      "rotation": 301.2,
      "pixel_coords": [322, 118, 12.9],
      "color": "gray",
      "text": {
        "font": "Bfont",
        "body": "z",
        "3d_coords": [1.8, -0.4, 0.8],
        "pixel_coords": [0.6708, 0.3688],
        "color": "red",
        "char_bboxes": {"cc": [{"id": "Text.001", "bbox": [316, 110, 9, 11], "visible_pixels": 41}]},
        "word_bboxes": {"cc": [[316, 110, 9, 11]]}
      }
    }
  ],
  "relationships": {
    "left": [[], [0]],
    "right": [[1], []],
    "front": [[1], []],
    "behind": [[], [0]]
  }
}"#;

#[test]
fn rendered_objects_answer_text_questions() {
    init_tracing();
    let scene: Scene = serde_json::from_str(RENDERED_SCENE).unwrap();

    // "What color is the thing that says z?"
    let mut program = Program::new(vec![
        Node::scene(),
        filter(Attribute::Text, 0, "z"),
        step(OpKind::Unique, [1]),
        step(OpKind::Query(Attribute::Color), [2]),
    ]);
    assert_eq!(evaluate(&mut program, &scene), Ok(Value::literal("gray")));

    // "What is written on the cylinder left of the cube?"
    let mut program = Program::new(vec![
        Node::scene(),
        filter(Attribute::Shape, 0, "cube"),
        step(OpKind::Unique, [1]),
        relate(2, "left"),
        filter(Attribute::Shape, 3, "cylinder"),
        step(OpKind::Unique, [4]),
        step(OpKind::Query(Attribute::Text), [5]),
    ]);
    assert_eq!(evaluate(&mut program, &scene), Ok(Value::literal("q")));

    let mut program = Program::new(vec![
        Node::scene(),
        filter(Attribute::Material, 0, "metal"),
        step(OpKind::Unique, [1]),
        step(OpKind::QueryTextTerminal, [2]),
        Node::new(OpKind::QueryTextQuestion),
        step(OpKind::Equal(EqualKind::Attribute(Attribute::Text)), [3, 4]),
    ]);
    let state = RunState::new().with(QUESTION_KEY, Value::literal("q"));
    assert_eq!(
        Executor::new().evaluate(&mut program, &scene, &state),
        Ok(Value::Bool(true))
    );
}

#[test]
fn rendered_geometry_is_not_an_answer() {
    let scene: Scene = serde_json::from_str(RENDERED_SCENE).unwrap();
    let cube = scene.object(1).unwrap();
    assert_eq!(cube.text().map(|t| t.pixel_coords.clone()), Some(vec![0.6708, 0.3688]));

    let mut program = Program::new(vec![
        Node::scene(),
        filter(Attribute::Text, 0, "0.7"),
        step(OpKind::Count, [1]),
    ]);
    assert_eq!(evaluate(&mut program, &scene), Ok(Value::Integer(0)));
}
