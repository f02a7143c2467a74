// @generated by model_tape_codegen from ops.json (schema version 1).
// Do not edit by hand; edit the schema and re-run the generator.

/// An instruction mnemonic in the tape instruction set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TapeOp {
    In,
    Out,
    Free,
    Jmp,
    JmpTrue,
    JmpFalse,
    FloatScalarConstant,
    FloatConstant,
    IntScalarConstant,
    IntConstant,
    NullConstant,
    ConstantFill,
    Identity,
    Neg,
    Reciprocal,
    Exp,
    Log,
    Sqrt,
    Tanh,
    Abs,
    Relu,
    Floor,
    Ceil,
    Sigmoid,
    Not,
    Shape,
    Size,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Equal,
    Greater,
    And,
    Or,
    Xor,
    ReluGrad,
    MaxPoolGrad,
    AveragePoolGrad,
    SelectItem,
    SelectItemGrad,
    Reshape,
    Expand,
    MatMul,
    ReduceSumTo,
    LinearGradWeight,
    Dropout,
    Selu,
    LeakyRelu,
    Elu,
    Linear,
    Conv,
    ConvTranspose,
    ConvTransposeWithDynamicShape,
    ConvGradWeight,
    Rnn,
    Gru,
    Lstm,
    LstmGrad,
    Squeeze,
    Unsqueeze,
    Gemm,
    BatchNormalization,
    BatchNormalizationGrad,
    Lrn,
    LrnGrad,
    Pad,
    MaxPool,
    AveragePool,
    Softmax,
    LogSoftmax,
    ArgMax,
    Hardmax,
    ReduceMax,
    ReduceSum,
    ReduceSumSquare,
    ReduceMean,
    Cast,
    OneHot,
    Slice,
    DynamicSlice,
    DynamicSliceGrad,
    Gather,
    GatherGrad,
    Concat,
    Split,
    Clip,
    Max,
    Transpose,
    Tvm,
    ElementWiseNvrtc,
    Print,
    GenericLen,
    GenericGetItem,
    GenericGetSlice,
    GenericAdd,
    GenericIs,
    GenericAccumulateGrad,
    SequenceCreate,
    SequenceSize,
    SequenceLengths,
    SequenceAppend,
    SequencePop,
    SequenceMove,
    SequenceCopy,
    SequenceLookup,
    SequenceLookupGrad,
    SequenceGetSlice,
    SequenceGetSliceGrad,
    SequenceStack,
    SequenceConcat,
    SequenceSplitAxis,
    SequenceSeparate,
    SequenceUnpad,
    SequencePad,
    SequenceRange,
}

const SIG_R_S: &[OperandKind] = &[OperandKind::Reg, OperandKind::Str];
const SIG_S_R: &[OperandKind] = &[OperandKind::Str, OperandKind::Reg];
const SIG_R: &[OperandKind] = &[OperandKind::Reg];
const SIG_I: &[OperandKind] = &[OperandKind::Int];
const SIG_R_I: &[OperandKind] = &[OperandKind::Reg, OperandKind::Int];
const SIG_R_F_I_I: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Float,
    OperandKind::Int,
    OperandKind::Int,
];
const SIG_R_FS_I_SH_I: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::FloatList,
    OperandKind::Int,
    OperandKind::Shape,
    OperandKind::Int,
];
const SIG_R_I_I_I: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Int,
    OperandKind::Int,
    OperandKind::Int,
];
const SIG_R_IS_I_SH_I: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::IntList,
    OperandKind::Int,
    OperandKind::Shape,
    OperandKind::Int,
];
const SIG_R_R_I_IS_IS_F: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Int,
    OperandKind::IntList,
    OperandKind::IntList,
    OperandKind::Float,
];
const SIG_R_R: &[OperandKind] = &[OperandKind::Reg, OperandKind::Reg];
const SIG_R_R_R: &[OperandKind] = &[OperandKind::Reg, OperandKind::Reg, OperandKind::Reg];
const SIG_R_R_R_R: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
];
const SIG_R_R_R_F: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Float,
];
const SIG_R_R_F_F: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Float,
    OperandKind::Float,
];
const SIG_R_R_F: &[OperandKind] = &[OperandKind::Reg, OperandKind::Reg, OperandKind::Float];
const SIG_R_R_R_R_I: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Int,
];
const SIG_R_R_R_R_IS_IS: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::IntList,
    OperandKind::IntList,
];
const SIG_R_R_R_R_IS_IS_IS: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::IntList,
    OperandKind::IntList,
    OperandKind::IntList,
];
const SIG_R_R_R_R_R_R_R_R_I_I: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Int,
    OperandKind::Int,
];
const SIG_R_R_R_R_R_R_R_R_I_I_I: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Int,
    OperandKind::Int,
    OperandKind::Int,
];
const SIG_R_R_R_R_R_R_R_R_R_R_R_R_I_I: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Int,
    OperandKind::Int,
];
const SIG_R_R_R_R_R_R: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
];
const SIG_R_R_IS: &[OperandKind] = &[OperandKind::Reg, OperandKind::Reg, OperandKind::IntList];
const SIG_R_R_R_R_F_F_I_I: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Float,
    OperandKind::Float,
    OperandKind::Int,
    OperandKind::Int,
];
const SIG_R_R_R_R_R_R_R_R_R_R_R_F_F_I: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Float,
    OperandKind::Float,
    OperandKind::Int,
];
const SIG_R_R_R_R_R: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
];
const SIG_R_R_R_F_F_F_I: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Float,
    OperandKind::Float,
    OperandKind::Float,
    OperandKind::Int,
];
const SIG_R_R_R_R_R_F_F_F_I: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Float,
    OperandKind::Float,
    OperandKind::Float,
    OperandKind::Int,
];
const SIG_R_R_IS_F: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::IntList,
    OperandKind::Float,
];
const SIG_R_R_R_IS_IS_IS_I: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::IntList,
    OperandKind::IntList,
    OperandKind::IntList,
    OperandKind::Int,
];
const SIG_R_R_I: &[OperandKind] = &[OperandKind::Reg, OperandKind::Reg, OperandKind::Int];
const SIG_R_R_I_I: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Int,
    OperandKind::Int,
];
const SIG_R_R_IS_I: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::IntList,
    OperandKind::Int,
];
const SIG_R_R_IS_IS_IS: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::IntList,
    OperandKind::IntList,
    OperandKind::IntList,
];
const SIG_R_R_R_I: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Int,
];
const SIG_R_RS_I: &[OperandKind] = &[OperandKind::Reg, OperandKind::RegList, OperandKind::Int];
const SIG_RS_R_I_IS: &[OperandKind] = &[
    OperandKind::RegList,
    OperandKind::Reg,
    OperandKind::Int,
    OperandKind::IntList,
];
const SIG_R_RS: &[OperandKind] = &[OperandKind::Reg, OperandKind::RegList];
const SIG_RS_RS_I_S_S_SH: &[OperandKind] = &[
    OperandKind::RegList,
    OperandKind::RegList,
    OperandKind::Int,
    OperandKind::Str,
    OperandKind::Str,
    OperandKind::Shape,
];
const SIG_RS_RS_I_S_I: &[OperandKind] = &[
    OperandKind::RegList,
    OperandKind::RegList,
    OperandKind::Int,
    OperandKind::Str,
    OperandKind::Int,
];
const SIG_RS: &[OperandKind] = &[OperandKind::RegList];
const SIG_R_R_I_F: &[OperandKind] = &[
    OperandKind::Reg,
    OperandKind::Reg,
    OperandKind::Int,
    OperandKind::Float,
];

impl TapeOp {
    /// Every op in schema order.
    pub const ALL: &'static [TapeOp] = &[
        Self::In,
        Self::Out,
        Self::Free,
        Self::Jmp,
        Self::JmpTrue,
        Self::JmpFalse,
        Self::FloatScalarConstant,
        Self::FloatConstant,
        Self::IntScalarConstant,
        Self::IntConstant,
        Self::NullConstant,
        Self::ConstantFill,
        Self::Identity,
        Self::Neg,
        Self::Reciprocal,
        Self::Exp,
        Self::Log,
        Self::Sqrt,
        Self::Tanh,
        Self::Abs,
        Self::Relu,
        Self::Floor,
        Self::Ceil,
        Self::Sigmoid,
        Self::Not,
        Self::Shape,
        Self::Size,
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Pow,
        Self::Equal,
        Self::Greater,
        Self::And,
        Self::Or,
        Self::Xor,
        Self::ReluGrad,
        Self::MaxPoolGrad,
        Self::AveragePoolGrad,
        Self::SelectItem,
        Self::SelectItemGrad,
        Self::Reshape,
        Self::Expand,
        Self::MatMul,
        Self::ReduceSumTo,
        Self::LinearGradWeight,
        Self::Dropout,
        Self::Selu,
        Self::LeakyRelu,
        Self::Elu,
        Self::Linear,
        Self::Conv,
        Self::ConvTranspose,
        Self::ConvTransposeWithDynamicShape,
        Self::ConvGradWeight,
        Self::Rnn,
        Self::Gru,
        Self::Lstm,
        Self::LstmGrad,
        Self::Squeeze,
        Self::Unsqueeze,
        Self::Gemm,
        Self::BatchNormalization,
        Self::BatchNormalizationGrad,
        Self::Lrn,
        Self::LrnGrad,
        Self::Pad,
        Self::MaxPool,
        Self::AveragePool,
        Self::Softmax,
        Self::LogSoftmax,
        Self::ArgMax,
        Self::Hardmax,
        Self::ReduceMax,
        Self::ReduceSum,
        Self::ReduceSumSquare,
        Self::ReduceMean,
        Self::Cast,
        Self::OneHot,
        Self::Slice,
        Self::DynamicSlice,
        Self::DynamicSliceGrad,
        Self::Gather,
        Self::GatherGrad,
        Self::Concat,
        Self::Split,
        Self::Clip,
        Self::Max,
        Self::Transpose,
        Self::Tvm,
        Self::ElementWiseNvrtc,
        Self::Print,
        Self::GenericLen,
        Self::GenericGetItem,
        Self::GenericGetSlice,
        Self::GenericAdd,
        Self::GenericIs,
        Self::GenericAccumulateGrad,
        Self::SequenceCreate,
        Self::SequenceSize,
        Self::SequenceLengths,
        Self::SequenceAppend,
        Self::SequencePop,
        Self::SequenceMove,
        Self::SequenceCopy,
        Self::SequenceLookup,
        Self::SequenceLookupGrad,
        Self::SequenceGetSlice,
        Self::SequenceGetSliceGrad,
        Self::SequenceStack,
        Self::SequenceConcat,
        Self::SequenceSplitAxis,
        Self::SequenceSeparate,
        Self::SequenceUnpad,
        Self::SequencePad,
        Self::SequenceRange,
    ];

    /// Returns the op's mnemonic string.
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::In => "In",
            Self::Out => "Out",
            Self::Free => "Free",
            Self::Jmp => "Jmp",
            Self::JmpTrue => "JmpTrue",
            Self::JmpFalse => "JmpFalse",
            Self::FloatScalarConstant => "FloatScalarConstant",
            Self::FloatConstant => "FloatConstant",
            Self::IntScalarConstant => "IntScalarConstant",
            Self::IntConstant => "IntConstant",
            Self::NullConstant => "NullConstant",
            Self::ConstantFill => "ConstantFill",
            Self::Identity => "Identity",
            Self::Neg => "Neg",
            Self::Reciprocal => "Reciprocal",
            Self::Exp => "Exp",
            Self::Log => "Log",
            Self::Sqrt => "Sqrt",
            Self::Tanh => "Tanh",
            Self::Abs => "Abs",
            Self::Relu => "Relu",
            Self::Floor => "Floor",
            Self::Ceil => "Ceil",
            Self::Sigmoid => "Sigmoid",
            Self::Not => "Not",
            Self::Shape => "Shape",
            Self::Size => "Size",
            Self::Add => "Add",
            Self::Sub => "Sub",
            Self::Mul => "Mul",
            Self::Div => "Div",
            Self::Pow => "Pow",
            Self::Equal => "Equal",
            Self::Greater => "Greater",
            Self::And => "And",
            Self::Or => "Or",
            Self::Xor => "Xor",
            Self::ReluGrad => "ReluGrad",
            Self::MaxPoolGrad => "MaxPoolGrad",
            Self::AveragePoolGrad => "AveragePoolGrad",
            Self::SelectItem => "SelectItem",
            Self::SelectItemGrad => "SelectItemGrad",
            Self::Reshape => "Reshape",
            Self::Expand => "Expand",
            Self::MatMul => "MatMul",
            Self::ReduceSumTo => "ReduceSumTo",
            Self::LinearGradWeight => "LinearGradWeight",
            Self::Dropout => "Dropout",
            Self::Selu => "Selu",
            Self::LeakyRelu => "LeakyRelu",
            Self::Elu => "Elu",
            Self::Linear => "Linear",
            Self::Conv => "Conv",
            Self::ConvTranspose => "ConvTranspose",
            Self::ConvTransposeWithDynamicShape => "ConvTransposeWithDynamicShape",
            Self::ConvGradWeight => "ConvGradWeight",
            Self::Rnn => "RNN",
            Self::Gru => "GRU",
            Self::Lstm => "LSTM",
            Self::LstmGrad => "LSTMGrad",
            Self::Squeeze => "Squeeze",
            Self::Unsqueeze => "Unsqueeze",
            Self::Gemm => "Gemm",
            Self::BatchNormalization => "BatchNormalization",
            Self::BatchNormalizationGrad => "BatchNormalizationGrad",
            Self::Lrn => "LRN",
            Self::LrnGrad => "LRNGrad",
            Self::Pad => "Pad",
            Self::MaxPool => "MaxPool",
            Self::AveragePool => "AveragePool",
            Self::Softmax => "Softmax",
            Self::LogSoftmax => "LogSoftmax",
            Self::ArgMax => "ArgMax",
            Self::Hardmax => "Hardmax",
            Self::ReduceMax => "ReduceMax",
            Self::ReduceSum => "ReduceSum",
            Self::ReduceSumSquare => "ReduceSumSquare",
            Self::ReduceMean => "ReduceMean",
            Self::Cast => "Cast",
            Self::OneHot => "OneHot",
            Self::Slice => "Slice",
            Self::DynamicSlice => "DynamicSlice",
            Self::DynamicSliceGrad => "DynamicSliceGrad",
            Self::Gather => "Gather",
            Self::GatherGrad => "GatherGrad",
            Self::Concat => "Concat",
            Self::Split => "Split",
            Self::Clip => "Clip",
            Self::Max => "Max",
            Self::Transpose => "Transpose",
            Self::Tvm => "TVM",
            Self::ElementWiseNvrtc => "ElementWiseNvrtc",
            Self::Print => "Print",
            Self::GenericLen => "GenericLen",
            Self::GenericGetItem => "GenericGetItem",
            Self::GenericGetSlice => "GenericGetSlice",
            Self::GenericAdd => "GenericAdd",
            Self::GenericIs => "GenericIs",
            Self::GenericAccumulateGrad => "GenericAccumulateGrad",
            Self::SequenceCreate => "SequenceCreate",
            Self::SequenceSize => "SequenceSize",
            Self::SequenceLengths => "SequenceLengths",
            Self::SequenceAppend => "SequenceAppend",
            Self::SequencePop => "SequencePop",
            Self::SequenceMove => "SequenceMove",
            Self::SequenceCopy => "SequenceCopy",
            Self::SequenceLookup => "SequenceLookup",
            Self::SequenceLookupGrad => "SequenceLookupGrad",
            Self::SequenceGetSlice => "SequenceGetSlice",
            Self::SequenceGetSliceGrad => "SequenceGetSliceGrad",
            Self::SequenceStack => "SequenceStack",
            Self::SequenceConcat => "SequenceConcat",
            Self::SequenceSplitAxis => "SequenceSplitAxis",
            Self::SequenceSeparate => "SequenceSeparate",
            Self::SequenceUnpad => "SequenceUnpad",
            Self::SequencePad => "SequencePad",
            Self::SequenceRange => "SequenceRange",
        }
    }

    /// Returns the op's fixed operand-kind signature.
    #[must_use]
    pub fn signature(self) -> &'static [OperandKind] {
        match self {
            Self::In => SIG_R_S,
            Self::Out => SIG_S_R,
            Self::Free | Self::NullConstant | Self::SequenceCreate => SIG_R,
            Self::Jmp => SIG_I,
            Self::JmpTrue | Self::JmpFalse => SIG_R_I,
            Self::FloatScalarConstant => SIG_R_F_I_I,
            Self::FloatConstant => SIG_R_FS_I_SH_I,
            Self::IntScalarConstant => SIG_R_I_I_I,
            Self::IntConstant => SIG_R_IS_I_SH_I,
            Self::ConstantFill => SIG_R_R_I_IS_IS_F,
            Self::Identity
            | Self::Neg
            | Self::Reciprocal
            | Self::Exp
            | Self::Log
            | Self::Sqrt
            | Self::Tanh
            | Self::Abs
            | Self::Relu
            | Self::Floor
            | Self::Ceil
            | Self::Sigmoid
            | Self::Not
            | Self::Shape
            | Self::Size
            | Self::GenericLen
            | Self::SequenceSize
            | Self::SequenceLengths
            | Self::SequenceAppend
            | Self::SequencePop
            | Self::SequenceMove
            | Self::SequenceCopy => SIG_R_R,
            Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::Pow
            | Self::Equal
            | Self::Greater
            | Self::And
            | Self::Or
            | Self::Xor
            | Self::ReluGrad
            | Self::MaxPoolGrad
            | Self::AveragePoolGrad
            | Self::SelectItem
            | Self::Reshape
            | Self::Expand
            | Self::MatMul
            | Self::ReduceSumTo
            | Self::LinearGradWeight
            | Self::GenericGetItem
            | Self::GenericAdd
            | Self::GenericIs
            | Self::GenericAccumulateGrad
            | Self::SequenceLookup
            | Self::SequenceUnpad => SIG_R_R_R,
            Self::SelectItemGrad | Self::SequenceLookupGrad | Self::SequenceRange => SIG_R_R_R_R,
            Self::Dropout => SIG_R_R_R_F,
            Self::Selu | Self::Clip => SIG_R_R_F_F,
            Self::LeakyRelu | Self::Elu => SIG_R_R_F,
            Self::Linear | Self::OneHot | Self::GatherGrad => SIG_R_R_R_R_I,
            Self::Conv | Self::ConvTransposeWithDynamicShape | Self::ConvGradWeight => {
                SIG_R_R_R_R_IS_IS
            }
            Self::ConvTranspose => SIG_R_R_R_R_IS_IS_IS,
            Self::Rnn => SIG_R_R_R_R_R_R_R_R_I_I,
            Self::Gru => SIG_R_R_R_R_R_R_R_R_I_I_I,
            Self::Lstm => SIG_R_R_R_R_R_R_R_R_R_R_R_R_I_I,
            Self::LstmGrad | Self::DynamicSliceGrad | Self::SequenceGetSliceGrad => {
                SIG_R_R_R_R_R_R
            }
            Self::Squeeze | Self::Unsqueeze | Self::Transpose => SIG_R_R_IS,
            Self::Gemm => SIG_R_R_R_R_F_F_I_I,
            Self::BatchNormalization => SIG_R_R_R_R_R_R_R_R_R_R_R_F_F_I,
            Self::BatchNormalizationGrad
            | Self::DynamicSlice
            | Self::GenericGetSlice
            | Self::SequenceGetSlice => SIG_R_R_R_R_R,
            Self::Lrn => SIG_R_R_R_F_F_F_I,
            Self::LrnGrad => SIG_R_R_R_R_R_F_F_F_I,
            Self::Pad => SIG_R_R_IS_F,
            Self::MaxPool | Self::AveragePool => SIG_R_R_R_IS_IS_IS_I,
            Self::Softmax
            | Self::LogSoftmax
            | Self::Hardmax
            | Self::Cast
            | Self::SequenceStack
            | Self::SequenceSeparate => SIG_R_R_I,
            Self::ArgMax => SIG_R_R_I_I,
            Self::ReduceMax | Self::ReduceSum | Self::ReduceSumSquare | Self::ReduceMean => {
                SIG_R_R_IS_I
            }
            Self::Slice => SIG_R_R_IS_IS_IS,
            Self::Gather | Self::SequenceConcat | Self::SequenceSplitAxis => SIG_R_R_R_I,
            Self::Concat => SIG_R_RS_I,
            Self::Split => SIG_RS_R_I_IS,
            Self::Max => SIG_R_RS,
            Self::Tvm => SIG_RS_RS_I_S_S_SH,
            Self::ElementWiseNvrtc => SIG_RS_RS_I_S_I,
            Self::Print => SIG_RS,
            Self::SequencePad => SIG_R_R_I_F,
        }
    }
}
