//! CPU side of the Xesqe demo: mesh data, OBJ loading, the procedural terrain, the bouncing body, the fly camera
//! and the orbiting light. Nothing here touches the GPU.

pub mod camera;
pub mod error;
pub mod light;
pub mod mesh;
pub mod obj;
pub mod physics;
pub mod scene;
pub mod terrain;

pub use camera::{fly, Camera, FlyInput};
pub use error::{MeshError, TerrainError};
pub use light::LightOrbit;
pub use mesh::{light_marker, DebugVertex, Mesh, Vertex, UP};
pub use obj::{load_obj, parse_obj};
pub use physics::{Body, FlatGround, Ground, PhysicsParams, GRAVITY};
pub use scene::{Scene, SceneInput, SceneSettings};
pub use terrain::{height_function, Terrain, TerrainConfig};
