// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe the shape of the problem:
// how many frames, shots and samples a sequence has, how a
// 4-D tensor is laid out, and which training loop to run.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and errors
//
// The ML layer checks every tensor it receives or produces
// against the descriptors defined here, so a shape mistake
// surfaces as a ShapeError naming the offending boundary
// instead of a panic deep inside a tensor kernel.
//
// Reference: Rust Book §5 (Structs), §9 (Error Handling)

// Sequence dimensions, the checked 4-D shape descriptor and ShapeError
pub mod dims;

// Which training loop to run and how the shot predictor attends
pub mod variant;
